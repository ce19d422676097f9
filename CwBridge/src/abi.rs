//! C calling shapes of the codec component
//!
//! Every member the bridge calls has one of these signatures. Outputs are
//! streamed back through a [`ByteSink`] so the component never hands over
//! memory the caller would have to free with the component's allocator.
#![allow(unsafe_code)]

use std::ffi::c_void;
use std::slice;

/// Opaque object owned by the component.
pub type Handle = *mut c_void;

/// Status code returned by fallible members; `0` means success.
pub type Status = i32;

/// Status value for success.
pub const STATUS_OK: Status = 0;

/// Output callback: the component calls it with each chunk of output.
pub type ByteSink = unsafe extern "C" fn(ctx: *mut c_void, data: *const u8, len: usize);

/// Parameterless constructor (`new`). Returns null on failure.
pub type ConstructFn = unsafe extern "C" fn() -> Handle;

/// Destructor (`free`).
pub type ReleaseFn = unsafe extern "C" fn(object: Handle);

/// `Load(object, data, len, aux)`; `aux` is always null.
pub type LoadFn =
    unsafe extern "C" fn(object: Handle, data: *const u8, len: usize, aux: *const c_void) -> Status;

/// Members that write an object out through a sink (`Save`, `GetXml`).
pub type EmitFn = unsafe extern "C" fn(object: Handle, sink: ByteSink, ctx: *mut c_void) -> Status;

/// Static XML factories (`GetRel`, `GetPso`). Returns null on failure.
pub type FromXmlFn = unsafe extern "C" fn(xml: *const u8, len: usize) -> Handle;

/// Last diagnostic message (`Interop::LastError`).
pub type LastErrorFn = unsafe extern "C" fn(sink: ByteSink, ctx: *mut c_void);

/// [`ByteSink`] that appends into the `Vec<u8>` passed as `ctx`.
///
/// # Safety
/// `ctx` must be null or point to a live `Vec<u8>` not otherwise borrowed,
/// and `data` must be valid for `len` bytes whenever `len > 0`.
pub unsafe extern "C" fn collect_into_vec(ctx: *mut c_void, data: *const u8, len: usize) {
    if ctx.is_null() || data.is_null() || len == 0 {
        return;
    }
    // SAFETY: guaranteed by the caller contract above.
    let (out, chunk) = unsafe { (&mut *ctx.cast::<Vec<u8>>(), slice::from_raw_parts(data, len)) };
    out.extend_from_slice(chunk);
}

/// Run `emit` with a sink collecting into a fresh buffer.
///
/// # Safety
/// `emit` must only call the sink with `ctx` during its own execution.
pub(crate) unsafe fn collect<F>(emit: F) -> (Status, Vec<u8>)
where
    F: FnOnce(ByteSink, *mut c_void) -> Status,
{
    let mut out: Vec<u8> = Vec::new();
    let ctx = (&raw mut out).cast::<c_void>();
    let status = emit(collect_into_vec, ctx);
    (status, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    unsafe extern "C" fn emit_twice(_object: Handle, sink: ByteSink, ctx: *mut c_void) -> Status {
        let first = b"<Dat151>";
        let second = b"</Dat151>";
        unsafe {
            sink(ctx, first.as_ptr(), first.len());
            sink(ctx, std::ptr::null(), 0);
            sink(ctx, second.as_ptr(), second.len());
        }
        STATUS_OK
    }

    #[test]
    fn test_collect_concatenates_chunks() {
        let emit: EmitFn = emit_twice;
        let (status, bytes) =
            unsafe { collect(|sink, ctx| emit(std::ptr::null_mut(), sink, ctx)) };
        assert_eq!(status, STATUS_OK);
        assert_eq!(bytes, b"<Dat151></Dat151>".to_vec());
    }

    #[test]
    fn test_sink_ignores_null_context() {
        let data = b"abc";
        unsafe { collect_into_vec(std::ptr::null_mut(), data.as_ptr(), data.len()) };
    }
}
