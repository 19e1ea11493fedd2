//! Global state of one application

use std::collections::BTreeMap;

use aema_core::{
    RejectReason, StateSchema, Storage, TealKeyValue, TealValue, MAX_KEY_LEN, MAX_KEY_VALUE_LEN,
};

use crate::StateDelta;

/// Global key-value slots, bounded by the application's schema
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlobalState {
    schema: StateSchema,
    slots: BTreeMap<Vec<u8>, TealValue>,
}

impl GlobalState {
    pub fn new(schema: StateSchema) -> Self {
        GlobalState {
            schema,
            slots: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> StateSchema {
        self.schema
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, key: &[u8]) -> Option<&TealValue> {
        self.slots.get(key)
    }

    /// Apply all deltas or none of them
    pub fn apply(&mut self, deltas: &[StateDelta]) -> Result<(), RejectReason> {
        let mut next = self.slots.clone();
        for delta in deltas {
            match delta {
                StateDelta::Put { key, value } => {
                    if key.len() > MAX_KEY_LEN || key.len() + value.len() > MAX_KEY_VALUE_LEN {
                        return Err(RejectReason::EntryTooLarge);
                    }
                    next.insert(key.clone(), TealValue::Bytes(value.clone()));
                }
                StateDelta::Delete { key } => {
                    next.remove(key);
                }
            }
        }

        let byte_slots = next
            .values()
            .filter(|v| matches!(v, TealValue::Bytes(_)))
            .count() as u64;
        if byte_slots > self.schema.num_byte_slice {
            return Err(RejectReason::SchemaExceeded);
        }

        self.slots = next;
        Ok(())
    }

    /// Ledger view of the slots
    pub fn to_key_values(&self) -> Vec<TealKeyValue> {
        self.slots
            .iter()
            .map(|(key, value)| TealKeyValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }

    /// Byte-slice slots as a map
    pub fn storage(&self) -> Storage {
        self.slots
            .iter()
            .filter_map(|(k, v)| v.as_bytes().map(|b| (k.clone(), b.to_vec())))
            .collect()
    }
}
