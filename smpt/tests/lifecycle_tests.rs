// SPDX-FileCopyrightText: 2025 Contributors to the ScienceMode binding project.
// SPDX-License-Identifier: Apache-2.0

//! Tests for scoped release and marshalling.

use std::{
    ffi::c_char,
    panic::{AssertUnwindSafe, catch_unwind},
    ptr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use smpt::{
    Error,
    lifecycle::{
        ForeignBuffer, Scoped, from_c_array, from_c_char_array, from_c_string, to_c_array,
        to_c_string, with_scoped, write_c_char_array,
    },
};

fn counting_release(count: &Arc<AtomicUsize>) -> impl FnOnce(Vec<u8>) -> smpt::Result<()> + Send + 'static {
    let count = count.clone();
    move |_| {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn release_runs_once_when_the_body_fails() {
    let count = Arc::new(AtomicUsize::new(0));
    let result: smpt::Result<()> = with_scoped(vec![0u8; 4], counting_release(&count), |buffer| {
        buffer[0] = 1;
        Err(Error::Other("failed halfway".into()))
    });

    assert!(matches!(result, Err(Error::Other(_))));
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn release_runs_once_when_the_body_panics() {
    let count = Arc::new(AtomicUsize::new(0));
    let release = counting_release(&count);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        with_scoped(vec![0u8; 4], release, |_| -> smpt::Result<()> { panic!("boom") })
    }));

    assert!(outcome.is_err());
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn explicit_release_is_not_repeated_on_drop() {
    let count = Arc::new(AtomicUsize::new(0));
    let mut scoped = Scoped::new(vec![1u8], counting_release(&count));
    scoped.release().unwrap();
    scoped.release().unwrap();
    assert!(scoped.is_released());
    drop(scoped);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn failing_release_is_contained() {
    let count = Arc::new(AtomicUsize::new(0));
    {
        let _broken = Scoped::new(1u32, |_| Err(Error::Other("release failed".into())));
        let _panicking = Scoped::new(2u32, |_| -> smpt::Result<()> { panic!("release panicked") });
        let _fine = Scoped::new(vec![3u8], counting_release(&count));
    }
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn empty_scope_is_a_no_op() {
    let mut scoped: Scoped<Vec<u8>> = Scoped::empty();
    assert!(scoped.get().is_none());
    assert!(scoped.release().is_ok());
}

#[test]
fn into_inner_skips_the_release() {
    let count = Arc::new(AtomicUsize::new(0));
    let scoped = Scoped::new(vec![7u8], counting_release(&count));
    assert_eq!(scoped.into_inner(), Some(vec![7u8]));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn foreign_buffer_views() {
    let mut bytes = [1u8, 2, 3];
    let mut view = ForeignBuffer::from_slice(&mut bytes);
    view.as_mut_slice()[1] = 9;
    assert_eq!(view.as_slice(), [1, 9, 3]);
    assert_eq!(bytes, [1, 9, 3]);

    let null = unsafe { ForeignBuffer::from_raw(ptr::null_mut(), 16) };
    assert!(null.is_empty());
    assert!(null.as_slice().is_empty());
}

#[test]
fn strings_cross_the_boundary() {
    assert!(matches!(to_c_string("a\0b"), Err(Error::NulString(_))));

    let owned = to_c_string("COM3").unwrap();
    assert_eq!(unsafe { from_c_string(owned.as_ptr()) }.as_deref(), Some("COM3"));
    assert_eq!(unsafe { from_c_string(ptr::null()) }, None);

    let empty = to_c_string("").unwrap();
    assert_eq!(unsafe { from_c_string(empty.as_ptr()) }.as_deref(), Some(""));
}

#[test]
fn char_arrays_are_terminated_and_truncated() {
    let mut name: [c_char; 8] = [0x7f; 8];
    assert_eq!(write_c_char_array(&mut name, "COM3"), 4);
    assert_eq!(name[4], 0);
    assert_eq!(name[7], 0);
    assert_eq!(from_c_char_array(&name), "COM3");

    assert_eq!(write_c_char_array(&mut name, "/dev/ttyUSB0"), 7);
    assert_eq!(from_c_char_array(&name), "/dev/tt");

    let unterminated = [b'a' as c_char, b'b' as c_char];
    assert_eq!(from_c_char_array(&unterminated), "ab");
}

#[test]
fn arrays_cross_the_boundary() {
    assert_eq!(to_c_array::<u8, 4>(&[]).unwrap(), None);
    assert_eq!(to_c_array::<u8, 4>(&[1, 2]).unwrap(), Some([1, 2, 0, 0]));
    assert!(matches!(to_c_array::<u8, 2>(&[1, 2, 3]), Err(Error::Other(_))));

    let values = [5u16, 6, 7];
    assert_eq!(unsafe { from_c_array(values.as_ptr(), values.len()) }, vec![5, 6, 7]);
    assert!(unsafe { from_c_array::<u16>(ptr::null(), 3) }.is_empty());
    assert!(unsafe { from_c_array(values.as_ptr(), 0) }.is_empty());
}
