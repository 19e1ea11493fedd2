//! Oracle schema and program limits
//!
//! The oracle application reserves 64 byte-slice global slots and nothing
//! else. An application that does not match is treated as foreign and is
//! removed by the reconciler.

use crate::{AccountInfo, Application, StateSchema};

/// Global numeric slots
pub const GLOBAL_INTS: u64 = 0;
/// Global byte-slice slots
pub const GLOBAL_BYTES: u64 = 64;
/// Local numeric slots
pub const LOCAL_INTS: u64 = 0;
/// Local byte-slice slots
pub const LOCAL_BYTES: u64 = 0;

/// Argument ceiling per application call
pub const MAX_ARGS: usize = 16;
/// Key-value pairs per put call (each pair takes two arguments)
pub const MAX_KV_ARGS: usize = MAX_ARGS / 2;
/// Total bytes across all arguments of one call
pub const MAX_ARGS_TOTAL_LEN: usize = 2048;
/// Longest storage key
pub const MAX_KEY_LEN: usize = 64;
/// Longest key plus value
pub const MAX_KEY_VALUE_LEN: usize = 128;

/// Schemas for the oracle application as `(local, global)`
pub fn generate_schemas() -> (StateSchema, StateSchema) {
    let local = StateSchema::new(LOCAL_INTS, LOCAL_BYTES);
    let global = StateSchema::new(GLOBAL_INTS, GLOBAL_BYTES);
    (local, global)
}

/// True if the application is a created oracle with the required global schema
pub fn fulfills_schema(app: &Application) -> bool {
    if app.id.is_zero() {
        return false;
    }
    let schema = app.params.global_state_schema;
    schema.num_byte_slice == GLOBAL_BYTES && schema.num_uint == GLOBAL_INTS
}

/// True if the account holds exactly one application and it is a valid oracle
pub fn valid_account(account: &AccountInfo) -> bool {
    matches!(account.created_apps.as_slice(), [app] if fulfills_schema(app))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppId, ApplicationParams};

    fn app(id: u64, ints: u64, bytes: u64) -> Application {
        Application {
            id: AppId::new(id),
            params: ApplicationParams {
                global_state_schema: StateSchema::new(ints, bytes),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_fulfills_schema() {
        assert!(fulfills_schema(&app(1, 0, 64)));
        assert!(!fulfills_schema(&app(0, 0, 64)));
        assert!(!fulfills_schema(&app(1, 1, 64)));
        assert!(!fulfills_schema(&app(1, 0, 63)));
        assert!(!fulfills_schema(&app(1, 18, 32)));
    }

    #[test]
    fn test_local_schema_ignored() {
        let mut a = app(1, 0, 64);
        a.params.local_state_schema = StateSchema::new(3, 3);
        assert!(fulfills_schema(&a));
    }

    #[test]
    fn test_generate_schemas() {
        let (local, global) = generate_schemas();
        assert_eq!(local, StateSchema::new(0, 0));
        assert_eq!(global, StateSchema::new(0, 64));
        assert!(fulfills_schema(&Application {
            id: AppId::new(9),
            params: ApplicationParams {
                global_state_schema: global,
                local_state_schema: local,
                ..Default::default()
            },
            ..Default::default()
        }));
    }

    #[test]
    fn test_valid_account() {
        let mut account = AccountInfo::default();
        assert!(!valid_account(&account));

        account.created_apps = vec![app(1, 0, 64)];
        assert!(valid_account(&account));

        account.created_apps.push(app(2, 0, 64));
        assert!(!valid_account(&account));

        account.created_apps = vec![app(3, 18, 32)];
        assert!(!valid_account(&account));
    }
}
