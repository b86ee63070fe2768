// invoke.rs — The one place that calls into host code at a raw address.
//
// Host methods use a register calling convention: the implicit receiver goes
// in edx and a single structured argument in eax. Nothing is returned that we
// care about. eax, ecx and edx are caller-saved; everything else is preserved.
//
// If the target address is wrong (host updated, layout out of date, widget
// freed and reused) the effect on the host is undefined. Nothing here can
// detect that; callers log every crossing under the "invoke" target and refuse
// targets that aren't executable memory.

use std::arch::asm;

/// Call `target` with `params` in eax and `receiver` in edx.
///
/// # Safety
/// `target` must be the entry of a host function expecting exactly this
/// register assignment, and `receiver`/`params` must be values that function
/// accepts. Any violation corrupts or crashes the host process.
#[inline(never)]
pub unsafe fn call_register(target: usize, params: usize, receiver: usize) {
    asm!(
        "call {target}",
        target = in(reg) target,
        in("eax") params,
        in("edx") receiver,
        clobber_abi("C"),
    );
}
