// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Scoped ownership of foreign structures and marshalling helpers.
//!
//! [`Scoped`] ties a resource to a release function that runs exactly once: on an
//! explicit [`Scoped::release`], or when the wrapper is dropped, including while
//! unwinding. A failing or panicking release is logged and never propagated out of
//! `Drop`, so one broken resource does not keep the others from being released.
//!
//! The free functions convert strings and fixed-length arrays between Rust and C
//! representations. A null pointer coming from C is always reported as absent, never
//! as an empty value.

use std::{
    ffi::{CStr, CString, c_char},
    marker::PhantomData,
    panic::{AssertUnwindSafe, catch_unwind},
};

use tracing::{debug, error};

use crate::{Error, Result};

type Release<T> = Box<dyn FnOnce(T) -> Result<()> + Send>;

/// A resource released exactly once.
pub struct Scoped<T> {
    resource: Option<T>,
    release: Option<Release<T>>,
}

impl<T> Scoped<T> {
    /// Wraps `resource`; `release` runs when the scope ends.
    pub fn new(resource: T, release: impl FnOnce(T) -> Result<()> + Send + 'static) -> Self {
        Self {
            resource: Some(resource),
            release: Some(Box::new(release)),
        }
    }

    /// A wrapper around nothing. Releasing it is a no-op.
    pub fn empty() -> Self {
        Self {
            resource: None,
            release: None,
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.resource.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.resource.as_mut()
    }

    /// Returns `true` once the resource has been released or taken.
    pub fn is_released(&self) -> bool {
        self.resource.is_none()
    }

    /// Releases the resource now and reports the outcome.
    ///
    /// Subsequent calls, and the eventual drop, do nothing.
    pub fn release(&mut self) -> Result<()> {
        match (self.resource.take(), self.release.take()) {
            (Some(resource), Some(release)) => release(resource),
            _ => Ok(()),
        }
    }

    /// Takes the resource out without releasing it.
    pub fn into_inner(mut self) -> Option<T> {
        self.release = None;
        self.resource.take()
    }
}

impl<T> Drop for Scoped<T> {
    fn drop(&mut self) {
        let (Some(resource), Some(release)) = (self.resource.take(), self.release.take()) else {
            return;
        };
        match catch_unwind(AssertUnwindSafe(|| release(resource))) {
            Ok(Ok(())) => debug!("released scoped resource"),
            Ok(Err(err)) => error!(error = %err, "failed to release scoped resource"),
            Err(_) => error!("release of scoped resource panicked"),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Scoped<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scoped")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

/// Acquires `resource`, runs `body` on it, and releases it on every exit path.
///
/// The release runs before this function returns, whether `body` succeeds, fails or
/// panics. Release failures are logged; the result of `body` is returned unchanged.
///
/// # Examples
///
/// ```
/// use smpt::lifecycle::with_scoped;
///
/// let total = with_scoped(vec![1, 2, 3], |_| Ok(()), |values| Ok(values.iter().sum::<i32>()))?;
/// assert_eq!(total, 6);
/// # Ok::<(), smpt::Error>(())
/// ```
pub fn with_scoped<T, R>(
    resource: T,
    release: impl FnOnce(T) -> Result<()> + Send + 'static,
    body: impl FnOnce(&mut T) -> Result<R>,
) -> Result<R> {
    let mut scoped = Scoped::new(resource, release);
    let result = match scoped.get_mut() {
        Some(resource) => body(resource),
        None => Err(Error::Released),
    };
    drop(scoped);
    result
}

/// A mutable view over foreign memory, valid for `'a`.
#[derive(Debug)]
pub struct ForeignBuffer<'a> {
    ptr: *mut u8,
    len: usize,
    _marker: PhantomData<&'a mut [u8]>,
}

impl<'a> ForeignBuffer<'a> {
    /// Views `len` bytes starting at `ptr`. A null `ptr` yields an empty view.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must be valid for reads and writes of `len` bytes for `'a`,
    /// and nothing else may access that memory while the view exists.
    pub unsafe fn from_raw(ptr: *mut u8, len: usize) -> Self {
        Self {
            ptr,
            len: if ptr.is_null() { 0 } else { len },
            _marker: PhantomData,
        }
    }

    pub fn from_slice(slice: &'a mut [u8]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        if self.ptr.is_null() {
            return &[];
        }
        // Safety: guaranteed by the constructors.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.ptr.is_null() {
            return &mut [];
        }
        // Safety: guaranteed by the constructors.
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

/// Converts a Rust string for passing to C.
///
/// # Errors
///
/// Returns [`Error::NulString`] if `value` contains an interior NUL byte.
pub fn to_c_string(value: &str) -> Result<CString> {
    Ok(CString::new(value)?)
}

/// Copies a C string into Rust. A null pointer yields `None`.
///
/// # Safety
///
/// A non-null `ptr` must point to a NUL-terminated string.
pub unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

/// Reads a NUL-terminated string out of a fixed-size `char` array.
///
/// Without a terminator the whole array is used.
pub fn from_c_char_array(chars: &[c_char]) -> String {
    let bytes: Vec<u8> = chars
        .iter()
        .take_while(|&&c| c != 0)
        .map(|&c| c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Writes `value` into a fixed-size `char` array, truncating to leave room for the
/// terminator, and zero-fills the rest. Returns the number of bytes copied.
pub fn write_c_char_array(dest: &mut [c_char], value: &str) -> usize {
    let Some(capacity) = dest.len().checked_sub(1) else {
        return 0;
    };
    let bytes = value.as_bytes();
    let copied = bytes.len().min(capacity);
    for (slot, &byte) in dest.iter_mut().zip(&bytes[..copied]) {
        *slot = byte as c_char;
    }
    dest[copied..].fill(0);
    copied
}

/// Converts `values` to a fixed-length array, zero-padding the tail.
///
/// Empty input is absent (`Ok(None)`).
///
/// # Errors
///
/// Returns [`Error::Other`] when `values` holds more than `N` elements.
pub fn to_c_array<T: Copy + Default, const N: usize>(values: &[T]) -> Result<Option<[T; N]>> {
    if values.is_empty() {
        return Ok(None);
    }
    if values.len() > N {
        return Err(Error::Other(format!(
            "{} elements do not fit into an array of {N}",
            values.len()
        )));
    }
    let mut array = [T::default(); N];
    array[..values.len()].copy_from_slice(values);
    Ok(Some(array))
}

/// Copies `len` elements starting at `ptr`. A null pointer or zero length yields an
/// empty vector.
///
/// # Safety
///
/// A non-null `ptr` must be valid for reads of `len` elements.
pub unsafe fn from_c_array<T: Copy>(ptr: *const T, len: usize) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(ptr, len) }.to_vec()
}
