use std::path::Path;

use approx_mutator::Dialect;

#[test]
fn detect_c() {
    assert_eq!(approx_mutator::detect_dialect(Path::new("foo.c")), Some(Dialect::C));
    assert_eq!(approx_mutator::detect_dialect(Path::new("include/foo.h")), Some(Dialect::C));
}

#[test]
fn detect_cpp() {
    for name in ["foo.cpp", "foo.cc", "foo.cxx", "foo.hpp", "foo.hh", "foo.C"] {
        assert_eq!(approx_mutator::detect_dialect(Path::new(name)), Some(Dialect::Cpp), "{name}");
    }
}

#[test]
fn detect_unknown_returns_none() {
    assert!(approx_mutator::detect_dialect(Path::new("foo.py")).is_none());
    assert!(approx_mutator::detect_dialect(Path::new("foo.rs")).is_none());
    assert!(approx_mutator::detect_dialect(Path::new("foo")).is_none());
}
