// memory.rs — Checked reads and writes of host process memory.
//
// Every access is preceded by a VirtualQuery so a bad offset in the layout
// (or a widget the host just freed) reads as zero instead of faulting. This
// doesn't make stale pointers safe: memory that was freed and reused by the
// host still reads "successfully".

use crate::pattern::BytePattern;
use std::ffi::CString;
use winapi::um::libloaderapi::GetModuleHandleA;
use winapi::um::memoryapi::VirtualQuery;
use winapi::um::processthreadsapi::GetCurrentProcess;
use winapi::um::psapi::{GetModuleInformation, MODULEINFO};
use winapi::um::winnt::{
    MEMORY_BASIC_INFORMATION, MEM_COMMIT, PAGE_EXECUTE, PAGE_EXECUTE_READ,
    PAGE_EXECUTE_READWRITE, PAGE_EXECUTE_WRITECOPY, PAGE_GUARD, PAGE_NOACCESS,
    PAGE_READONLY, PAGE_READWRITE, PAGE_WRITECOPY,
};

const READABLE: u32 = PAGE_READONLY | PAGE_READWRITE | PAGE_WRITECOPY
    | PAGE_EXECUTE_READ | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY;

const WRITABLE: u32 = PAGE_READWRITE | PAGE_WRITECOPY
    | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY;

const EXECUTABLE: u32 = PAGE_EXECUTE | PAGE_EXECUTE_READ
    | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY;

/// Committed region info for `addr`, or None if the query fails.
unsafe fn query(addr: usize) -> Option<MEMORY_BASIC_INFORMATION> {
    if addr == 0 { return None; }
    let mut mbi: MEMORY_BASIC_INFORMATION = std::mem::zeroed();
    let ret = VirtualQuery(addr as *const _, &mut mbi,
        std::mem::size_of::<MEMORY_BASIC_INFORMATION>());
    if ret == 0 || mbi.State != MEM_COMMIT { return None; }
    if mbi.Protect & (PAGE_GUARD | PAGE_NOACCESS) != 0 { return None; }
    Some(mbi)
}

/// Whether `[addr, addr + len)` is committed with any of the `flags` protections.
unsafe fn has_access(addr: usize, len: usize, flags: u32) -> bool {
    if len == 0 { return false; }
    match query(addr) {
        Some(mbi) => mbi.Protect & flags != 0
            && addr + len <= mbi.BaseAddress as usize + mbi.RegionSize,
        None => false,
    }
}

pub unsafe fn is_readable(addr: usize, len: usize) -> bool { has_access(addr, len, READABLE) }

pub unsafe fn is_executable(addr: usize) -> bool { has_access(addr, 1, EXECUTABLE) }

/// Read a u32 (0 if unreadable).
#[inline]
pub unsafe fn read_u32(addr: usize) -> u32 {
    if !is_readable(addr, 4) { return 0; }
    std::ptr::read_unaligned(addr as *const u32)
}

/// Read a pointer-sized field as an address (0 if unreadable).
#[inline]
pub unsafe fn read_ptr(addr: usize) -> usize { read_u32(addr) as usize }

/// Read a u8 (0 if unreadable).
#[inline]
pub unsafe fn read_u8(addr: usize) -> u8 {
    if !is_readable(addr, 1) { return 0; }
    std::ptr::read(addr as *const u8)
}

/// Write an i32. Returns false (and writes nothing) if the target isn't writable.
pub unsafe fn write_i32(addr: usize, value: i32) -> bool {
    if !has_access(addr, 4, WRITABLE) { return false; }
    std::ptr::write_unaligned(addr as *mut i32, value);
    true
}

/// Base and end address of a loaded module.
pub unsafe fn module_range(name: &str) -> Option<(usize, usize)> {
    let name = CString::new(name).ok()?;
    let h = GetModuleHandleA(name.as_ptr());
    if h.is_null() { return None; }
    let mut info: MODULEINFO = std::mem::zeroed();
    let ok = GetModuleInformation(
        GetCurrentProcess(), h, &mut info,
        std::mem::size_of::<MODULEINFO>() as u32,
    );
    if ok == 0 { return None; }
    Some((info.lpBaseOfDll as usize, info.lpBaseOfDll as usize + info.SizeOfImage as usize))
}

/// Address of the first match of `pattern` in any readable region of `module`.
/// A match spanning two regions is not found.
pub unsafe fn scan_module(module: &str, pattern: &BytePattern) -> Option<usize> {
    let (start, end) = module_range(module)?;

    let mut addr = start;
    while addr < end {
        let mut mbi: MEMORY_BASIC_INFORMATION = std::mem::zeroed();
        let ret = VirtualQuery(addr as *const _, &mut mbi,
            std::mem::size_of::<MEMORY_BASIC_INFORMATION>());
        if ret == 0 { break; }
        let region_end = (mbi.BaseAddress as usize + mbi.RegionSize).min(end);

        let readable = mbi.State == MEM_COMMIT
            && mbi.Protect & READABLE != 0
            && mbi.Protect & PAGE_GUARD == 0;
        if readable && region_end > addr {
            let region = std::slice::from_raw_parts(addr as *const u8, region_end - addr);
            if let Some(offset) = pattern.find_in(region) {
                return Some(addr + offset);
            }
        }
        addr = region_end;
    }
    None
}
