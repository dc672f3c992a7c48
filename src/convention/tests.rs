//! Comprehensive test suite for the call convention

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::fiber::{CallCtx, Fiber, NativeFunction};
use crate::panic::{Panic, PanicKind};
use crate::runtime::Runtime;
use crate::value::{AbstractValue, Value};


#[test]
fn test_get_matches_kind() {
    let values = vec![Value::from(2.5), Value::str("hi"), Value::Bool(true)];
    let args = Args::new(&values);

    assert_eq!(args.get::<f64>(0).unwrap(), 2.5);
    assert_eq!(&*args.get::<Rc<str>>(1).unwrap(), "hi");
    assert!(args.get::<bool>(2).unwrap());
}

#[test]
fn test_get_any_value() {
    let values = vec![Value::str("x")];
    let args = Args::new(&values);
    assert_eq!(args.get::<Value>(0).unwrap(), Value::str("x"));
}

#[test]
fn test_get_wrong_kind_names_slot_and_kinds() {
    let values = vec![Value::str("x")];
    let args = Args::new(&values);

    let err = args.get::<f64>(0).unwrap_err();
    assert_eq!(err.kind(), PanicKind::Type);
    assert_eq!(
        err.to_string(),
        "type error: bad slot #0, expected number, got string \"x\""
    );
}

#[test]
fn test_get_reports_actual_value_kind() {
    let values = vec![Value::array(vec![])];
    let args = Args::new(&values);

    let err = args.get::<Rc<str>>(0).unwrap_err();
    assert!(err.to_string().contains("expected string"));
    assert!(err.to_string().contains("[]"));
}

#[test]
fn test_integer_subkinds() {
    let values = vec![Value::from(7.0), Value::from(1.5), Value::from(-3.0)];
    let args = Args::new(&values);

    assert_eq!(args.int32(0).unwrap(), 7);
    assert_eq!(args.int64(0).unwrap(), 7);
    assert_eq!(args.size(0).unwrap(), 7);
    assert_eq!(args.nat(0).unwrap(), 7);

    // non-integral numbers are rejected, not rounded
    assert!(args.int32(1).is_err());
    assert!(args.int64(1).is_err());
    assert!(args.size(1).is_err());

    assert_eq!(args.int64(2).unwrap(), -3);
    assert!(args.size(2).is_err());
}

#[test]
fn test_int32_range() {
    let values = vec![Value::from(2_147_483_648.0)];
    let args = Args::new(&values);

    let err = args.int32(0).unwrap_err();
    assert!(err.to_string().contains("expected 32 bit integer"));
    assert_eq!(args.int64(0).unwrap(), 2_147_483_648);
}

#[test]
fn test_nat_rejects_negative_with_message() {
    let values = vec![Value::from(-1.0)];
    let args = Args::new(&values);

    let err = args.nat(0).unwrap_err();
    assert_eq!(err.kind(), PanicKind::Type);
    assert!(err.to_string().contains("expected non-negative 64 bit integer, got -1"));
}

#[test]
fn test_opt_defaults_on_absent_and_nil() {
    let values = vec![Value::Nil];
    let args = Args::new(&values);

    assert_eq!(args.opt::<f64>(0, 1.5).unwrap(), 1.5); // nil slot
    assert_eq!(args.opt::<f64>(3, 2.5).unwrap(), 2.5); // past count
    assert_eq!(args.opt_nat(0, 9).unwrap(), 9);
}

#[test]
fn test_opt_present_behaves_like_required() {
    let values = vec![Value::from(4.0), Value::str("x")];
    let args = Args::new(&values);

    assert_eq!(args.opt::<f64>(0, 1.0).unwrap(), 4.0);
    let err = args.opt::<f64>(1, 1.0).unwrap_err();
    assert_eq!(err.kind(), PanicKind::Type);
}

#[test]
fn test_opt_container_defaults_are_fresh() {
    let values = vec![];
    let args = Args::new(&values);

    let a = args.opt_array(0, 4).unwrap();
    let b = args.opt_array(0, 4).unwrap();
    assert!(!Rc::ptr_eq(&a, &b));

    // independently mutable
    a.borrow_mut().push(Value::from(1.0));
    assert_eq!(a.borrow().len(), 1);
    assert_eq!(b.borrow().len(), 0);

    let t1 = args.opt_table(0, 4).unwrap();
    let t2 = args.opt_table(0, 4).unwrap();
    assert!(!Rc::ptr_eq(&t1, &t2));

    let b1 = args.opt_buffer(0, 16).unwrap();
    let b2 = args.opt_buffer(0, 16).unwrap();
    assert!(!Rc::ptr_eq(&b1, &b2));
}

#[test]
fn test_opt_container_passes_supplied_instance_through() {
    let arr = Value::array(vec![Value::from(1.0)]);
    let values = vec![arr.clone()];
    let args = Args::new(&values);

    let got = args.opt_array(0, 0).unwrap();
    if let Value::Array(original) = &arr {
        assert!(Rc::ptr_eq(&got, original));
    } else {
        unreachable!();
    }
}

#[test]
fn test_get_container_kinds() {
    let values = vec![
        Value::buffer(b"ab".to_vec()),
        Value::table_from([("k".to_string(), Value::Nil)]),
        Value::struct_from([("k".to_string(), Value::Nil)]),
    ];
    let args = Args::new(&values);

    assert_eq!(args.buffer(0).unwrap().borrow().len(), 2);
    assert_eq!(args.table(1).unwrap().borrow().len(), 1);
    assert_eq!(args.structure(2).unwrap().len(), 1);

    // table and struct are distinct kinds
    let err = args.table(2).unwrap_err();
    assert!(err.to_string().contains("expected table, got struct"));
}

#[test]
fn test_get_function_and_fiber_kinds() {
    fn noop(_ctx: &mut CallCtx<'_>) -> Result<Value, Panic> {
        Ok(Value::Nil)
    }
    let values = vec![
        Value::Function(Rc::new(NativeFunction::fixed("noop", 0, noop))),
        Value::Fiber(Rc::new(RefCell::new(Fiber::new()))),
    ];
    let args = Args::new(&values);

    assert_eq!(args.function(0).unwrap().name, "noop");
    assert_eq!(args.fiber(1).unwrap().borrow().depth(), 0);
    assert!(args.function(1).is_err());
}

#[test]
fn test_get_abstract_and_pointer_kinds() {
    struct Handle {
        id: u32,
    }
    impl AbstractValue for Handle {
        fn type_name(&self) -> &'static str {
            "handle"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    let values = vec![
        Value::Abstract(Rc::new(Handle { id: 7 })),
        Value::Pointer(std::ptr::null()),
    ];
    let args = Args::new(&values);

    let handle = args.abstract_ref(0).unwrap();
    assert_eq!(handle.type_name(), "handle");
    assert_eq!(handle.as_any().downcast_ref::<Handle>().unwrap().id, 7);

    assert!(args.pointer(1).unwrap().is_null());
    let err = args.abstract_ref(1).unwrap_err();
    assert!(err.to_string().contains("expected abstract"));
}

#[test]
fn test_arity_wrappers() {
    let values = vec![Value::Nil, Value::Nil];
    let args = Args::new(&values);

    assert!(args.arity_exact(2).is_ok());
    assert!(args.arity(1, None).is_ok());
    assert!(args.arity(3, None).is_err());

    let err = args.arity_exact(3).unwrap_err();
    assert_eq!(err.kind(), PanicKind::Arity);
    assert!(err.to_string().contains("expected 3 argument(s), got 2"));
}

#[test]
fn test_ring_index_wraps() {
    let values = vec![Value::Nil, Value::from(7.0)];
    let args = Args::new(&values);

    assert_eq!(ring_index(&args, 1, 5).unwrap(), 2);
    assert_eq!(ring_index(&args, 1, 7).unwrap(), 0);
    assert_eq!(ring_index(&args, 1, 10).unwrap(), 7);
}

#[test]
fn test_ring_index_empty_container() {
    let values = vec![Value::from(0.0)];
    let args = Args::new(&values);

    let err = ring_index(&args, 0, 0).unwrap_err();
    assert_eq!(err.kind(), PanicKind::Index);
    assert!(err.to_string().contains("length 0"));
}

#[test]
fn test_half_range_basic() {
    let values = vec![Value::from(1.0), Value::from(3.0)];
    let args = Args::new(&values);

    assert_eq!(half_range(&args, 0, 1, 5).unwrap(), (1, 3));
}

#[test]
fn test_half_range_negative_counts_from_end() {
    // -1 denotes the length, so [0, -1) spans everything
    let values = vec![Value::from(0.0), Value::from(-1.0)];
    let args = Args::new(&values);
    assert_eq!(half_range(&args, 0, 1, 5).unwrap(), (0, 5));

    let values = vec![Value::from(-3.0), Value::from(-1.0)];
    let args = Args::new(&values);
    assert_eq!(half_range(&args, 0, 1, 5).unwrap(), (3, 5));
}

#[test]
fn test_half_range_end_defaults_to_length() {
    let values = vec![Value::from(2.0)];
    let args = Args::new(&values);
    assert_eq!(half_range(&args, 0, 1, 6).unwrap(), (2, 6));

    let values = vec![Value::from(2.0), Value::Nil];
    let args = Args::new(&values);
    assert_eq!(half_range(&args, 0, 1, 6).unwrap(), (2, 6));
}

#[test]
fn test_half_range_rejects_out_of_bounds_by_role() {
    let values = vec![Value::from(9.0), Value::from(2.0)];
    let args = Args::new(&values);
    let err = half_range(&args, 0, 1, 5).unwrap_err();
    assert_eq!(err.kind(), PanicKind::Index);
    assert!(err.to_string().contains("bad start index 9"));

    let values = vec![Value::from(0.0), Value::from(-7.0)];
    let args = Args::new(&values);
    let err = half_range(&args, 0, 1, 5).unwrap_err();
    assert!(err.to_string().contains("bad end index -7"));
}

#[test]
fn test_half_range_rejects_inverted() {
    let values = vec![Value::from(4.0), Value::from(2.0)];
    let args = Args::new(&values);

    let err = half_range(&args, 0, 1, 5).unwrap_err();
    assert_eq!(err.kind(), PanicKind::Index);
    assert!(err.to_string().contains("start exceeds end"));
}

#[test]
fn test_flags_decode() {
    let values = vec![Value::str("rw")];
    let args = Args::new(&values);

    let bits = flags(&args, 0, "rwx").unwrap();
    assert_eq!(bits, 0b011);

    let values = vec![Value::str("")];
    let args = Args::new(&values);
    assert_eq!(flags(&args, 0, "rwx").unwrap(), 0);
}

#[test]
fn test_flags_rejects_unknown() {
    let values = vec![Value::str("rq")];
    let args = Args::new(&values);

    let err = flags(&args, 0, "rwx").unwrap_err();
    assert_eq!(err.kind(), PanicKind::Value);
    assert!(err.to_string().contains("unexpected flag q"));
    assert!(err.to_string().contains("rwx"));
}

// End-to-end scenario: a native exercising the whole convention

fn ringset(ctx: &mut CallCtx<'_>) -> Result<Value, Panic> {
    ctx.args.arity_exact(3)?;
    let arr = ctx.args.array(0)?;
    let len = arr.borrow().len();
    let idx = ring_index(&ctx.args, 1, len)?;
    let value = ctx.args.get::<Value>(2)?;
    arr.borrow_mut()[idx] = value;
    Ok(Value::Array(arr))
}

#[test]
fn test_ringset_wraps_and_preserves_identity() {
    let rt = Runtime::new();
    let mut fiber = Fiber::new();
    let f = NativeFunction::fixed("ringset", 3, ringset);

    let arr = Value::array((0..5).map(|i| Value::from(i as f64)).collect());
    let result = fiber
        .invoke(&f, &[arr.clone(), Value::from(7.0), Value::from(99.0)], &rt)
        .unwrap();

    // index 7 wraps to 2, identity unchanged
    assert_eq!(result, arr);
    if let Value::Array(items) = &arr {
        assert_eq!(items.borrow()[2], Value::from(99.0));
        assert_eq!(items.borrow()[0], Value::from(0.0));
    } else {
        unreachable!();
    }
}

#[test]
fn test_ringset_rejects_negative_index() {
    let rt = Runtime::new();
    let mut fiber = Fiber::new();
    let f = NativeFunction::fixed("ringset", 3, ringset);

    let arr = Value::array((0..5).map(|i| Value::from(i as f64)).collect());
    let err = fiber
        .invoke(&f, &[arr, Value::from(-1.0), Value::from(99.0)], &rt)
        .unwrap_err();

    assert!(err.to_string().contains("expected non-negative 64 bit integer, got -1"));
    assert_eq!(fiber.depth(), 0);
}
