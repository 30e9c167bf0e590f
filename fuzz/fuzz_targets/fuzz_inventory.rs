#![no_main]
use keytab_gate_core::context::ExecutionContext;
use keytab_gate_engine::gate::evaluator::KerberosKeytabGate;
use keytab_gate_engine::inventory::snapshot::ClusterInventory;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(inventory) = serde_json::from_slice::<ClusterInventory>(data) {
        if inventory.validate().is_err() {
            return;
        }
        let gate = KerberosKeytabGate::new(&inventory, &inventory, &inventory);
        for entry in &inventory.clusters {
            let _ = gate.evaluate(&ExecutionContext::new(entry.name.clone()));
        }
    }
});
