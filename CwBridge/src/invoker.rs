//! Typed invocation of component members
//!
//! A [`Member`] is a function pointer resolved by name from a
//! [`NamedType`](crate::bridge::NamedType). The helpers here wrap the raw
//! calling shapes from [`crate::abi`] into safe operations on [`Instance`]s:
//! construct, load, serialize, parse from XML, render to XML.
#![allow(unsafe_code)]

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

use libloading::Library;

use crate::abi::{
    self, ConstructFn, EmitFn, FromXmlFn, LastErrorFn, LoadFn, ReleaseFn, STATUS_OK, Status,
};
use crate::error::{Error, Result};
use crate::xml::XmlDocument;

/// A resolved member, valid for as long as the component stays loaded.
#[derive(Clone)]
pub struct Member<'lib, F> {
    owner: String,
    name: String,
    func: F,
    _library: PhantomData<&'lib Library>,
}

impl<F> fmt::Debug for Member<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member({})", self.operation())
    }
}

impl<'lib, F: Copy> Member<'lib, F> {
    pub(crate) fn new(owner: &str, name: &str, func: F) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            func,
            _library: PhantomData,
        }
    }

    /// The raw function pointer.
    #[must_use]
    pub fn get(&self) -> F {
        self.func
    }
}

impl<F> Member<'_, F> {
    /// `Type::Member`, relative to the namespace.
    #[must_use]
    pub fn operation(&self) -> String {
        format!("{}::{}", self.owner, self.name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Source of failure messages for codec errors.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics<'lib> {
    last_error: Option<Member<'lib, LastErrorFn>>,
}

impl<'lib> Diagnostics<'lib> {
    #[must_use]
    pub fn new(last_error: Option<Member<'lib, LastErrorFn>>) -> Self {
        Self { last_error }
    }

    /// Build a codec error for a failed `operation`.
    fn failure(&self, operation: String, fallback: &str) -> Error {
        let message = self
            .last_message()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        Error::Codec { operation, message }
    }

    fn last_message(&self) -> Option<String> {
        let member = self.last_error.as_ref()?;
        let func = member.get();
        // SAFETY: `LastError` only writes through the sink during the call.
        let (_, bytes) = unsafe {
            abi::collect(|sink, ctx| {
                func(sink, ctx);
                STATUS_OK
            })
        };
        Some(String::from_utf8_lossy(&bytes).trim().to_string())
    }
}

/// An object created by the component.
///
/// Released through the type's `free` member on drop when the component
/// exports one; otherwise the component keeps ownership.
pub struct Instance<'lib> {
    type_name: String,
    handle: NonNull<c_void>,
    release: Option<ReleaseFn>,
    _library: PhantomData<&'lib Library>,
}

impl fmt::Debug for Instance<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

impl<'lib> Instance<'lib> {
    fn adopt(
        type_name: &str,
        handle: *mut c_void,
        release: Option<&Member<'lib, ReleaseFn>>,
    ) -> Option<Self> {
        NonNull::new(handle).map(|handle| Self {
            type_name: type_name.to_string(),
            handle,
            release: release.map(Member::get),
            _library: PhantomData,
        })
    }

    /// Dotted name of the instance's type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    fn as_raw(&self) -> *mut c_void {
        self.handle.as_ptr()
    }

    /// Feed raw file bytes into the object (`Load(data, null)`).
    pub fn load(
        &mut self,
        member: &Member<'lib, LoadFn>,
        data: &[u8],
        diagnostics: &Diagnostics<'lib>,
    ) -> Result<()> {
        let load = member.get();
        // SAFETY: `data` outlives the call; the handle came from this component.
        let status = unsafe { load(self.as_raw(), data.as_ptr(), data.len(), ptr::null()) };
        check_status(status, member, diagnostics)
    }

    /// Serialize the object to its packed binary form (`Save()`).
    pub fn serialize(
        &self,
        member: &Member<'lib, EmitFn>,
        diagnostics: &Diagnostics<'lib>,
    ) -> Result<Vec<u8>> {
        emit(member, self, diagnostics)
    }
}

impl Drop for Instance<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            // SAFETY: the handle is owned by this instance and released once.
            unsafe { release(self.as_raw()) };
        }
    }
}

/// Invoke a parameterless constructor.
pub fn construct<'lib>(
    ctor: &Member<'lib, ConstructFn>,
    release: Option<&Member<'lib, ReleaseFn>>,
    diagnostics: &Diagnostics<'lib>,
) -> Result<Instance<'lib>> {
    let new = ctor.get();
    // SAFETY: resolved with the constructor signature.
    let handle = unsafe { new() };
    Instance::adopt(&ctor.owner, handle, release)
        .ok_or_else(|| diagnostics.failure(ctor.operation(), "constructor returned null"))
}

/// Invoke a static XML factory; the result is an instance of `result_type`.
pub fn parse_from_xml<'lib>(
    factory: &Member<'lib, FromXmlFn>,
    document: &XmlDocument,
    result_type: &str,
    release: Option<&Member<'lib, ReleaseFn>>,
    diagnostics: &Diagnostics<'lib>,
) -> Result<Instance<'lib>> {
    let get = factory.get();
    let text = document.as_str().as_bytes();
    // SAFETY: `text` outlives the call; the component copies what it keeps.
    let handle = unsafe { get(text.as_ptr(), text.len()) };
    Instance::adopt(result_type, handle, release)
        .ok_or_else(|| diagnostics.failure(factory.operation(), "document was rejected"))
}

/// Invoke a static renderer taking `instance`, returning XML text.
pub fn render_to_xml<'lib>(
    renderer: &Member<'lib, EmitFn>,
    instance: &Instance<'lib>,
    diagnostics: &Diagnostics<'lib>,
) -> Result<String> {
    let bytes = emit(renderer, instance, diagnostics)?;
    Ok(String::from_utf8(bytes)?)
}

fn emit<'lib>(
    member: &Member<'lib, EmitFn>,
    instance: &Instance<'lib>,
    diagnostics: &Diagnostics<'lib>,
) -> Result<Vec<u8>> {
    let func = member.get();
    // SAFETY: the sink and its buffer only live for the duration of the call.
    let (status, bytes) = unsafe { abi::collect(|sink, ctx| func(instance.as_raw(), sink, ctx)) };
    check_status(status, member, diagnostics)?;
    Ok(bytes)
}

fn check_status<F>(status: Status, member: &Member<'_, F>, diagnostics: &Diagnostics<'_>) -> Result<()> {
    if status == STATUS_OK {
        Ok(())
    } else {
        Err(diagnostics.failure(member.operation(), &format!("status {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    struct Fake {
        bytes: Vec<u8>,
    }

    unsafe extern "C" fn fake_new() -> abi::Handle {
        Box::into_raw(Box::new(Fake { bytes: Vec::new() })).cast()
    }

    unsafe extern "C" fn fake_free(object: abi::Handle) {
        drop(unsafe { Box::from_raw(object.cast::<Fake>()) });
        RELEASED.fetch_add(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn fake_load(
        object: abi::Handle,
        data: *const u8,
        len: usize,
        _aux: *const c_void,
    ) -> Status {
        let fake = unsafe { &mut *object.cast::<Fake>() };
        let data = unsafe { std::slice::from_raw_parts(data, len) };
        if data.starts_with(b"RBIN") {
            fake.bytes = data.to_vec();
            STATUS_OK
        } else {
            7
        }
    }

    unsafe extern "C" fn fake_save(object: abi::Handle, sink: abi::ByteSink, ctx: *mut c_void) -> Status {
        let fake = unsafe { &*object.cast::<Fake>() };
        unsafe { sink(ctx, fake.bytes.as_ptr(), fake.bytes.len()) };
        STATUS_OK
    }

    unsafe extern "C" fn fake_last_error(sink: abi::ByteSink, ctx: *mut c_void) {
        let message = b"bad header\n";
        unsafe { sink(ctx, message.as_ptr(), message.len()) };
    }

    #[test]
    fn test_construct_load_serialize() {
        let ctor = Member::<ConstructFn>::new("GameFiles.RelFile", "new", fake_new);
        let free = Member::<ReleaseFn>::new("GameFiles.RelFile", "free", fake_free);
        let load = Member::<LoadFn>::new("GameFiles.RelFile", "Load", fake_load);
        let save = Member::<EmitFn>::new("GameFiles.RelFile", "Save", fake_save);
        let diagnostics = Diagnostics::default();

        let before = RELEASED.load(Ordering::SeqCst);
        {
            let mut rel = construct(&ctor, Some(&free), &diagnostics).unwrap();
            assert_eq!(rel.type_name(), "GameFiles.RelFile");
            rel.load(&load, b"RBIN\x01\x02", &diagnostics).unwrap();
            assert_eq!(rel.serialize(&save, &diagnostics).unwrap(), b"RBIN\x01\x02".to_vec());
        }
        assert!(RELEASED.load(Ordering::SeqCst) > before);
    }

    #[test]
    fn test_failed_load_uses_last_error() {
        let ctor = Member::<ConstructFn>::new("GameFiles.RelFile", "new", fake_new);
        let free = Member::<ReleaseFn>::new("GameFiles.RelFile", "free", fake_free);
        let load = Member::<LoadFn>::new("GameFiles.RelFile", "Load", fake_load);
        let last_error = Member::<LastErrorFn>::new("Interop", "LastError", fake_last_error);

        let quiet = Diagnostics::default();
        let mut rel = construct(&ctor, Some(&free), &quiet).unwrap();
        match rel.load(&load, b"junk", &quiet) {
            Err(Error::Codec { operation, message }) => {
                assert_eq!(operation, "GameFiles.RelFile::Load");
                assert_eq!(message, "status 7");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let verbose = Diagnostics::new(Some(last_error));
        match rel.load(&load, b"junk", &verbose) {
            Err(Error::Codec { message, .. }) => assert_eq!(message, "bad header"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
