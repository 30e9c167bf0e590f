#![no_main]
use keytab_gate_core::types::KdcType;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let kdc = KdcType::from_property(Some(data));
    if data.trim().is_empty() {
        assert!(kdc.is_none());
    }
    let reparsed = KdcType::from_property(Some(kdc.as_property()));
    assert_eq!(reparsed, kdc);
});
