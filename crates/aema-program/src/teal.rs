//! Deployable TEAL sources

/// Approval program.
///
/// Reading an argument past the end fails the program, so a put call with an
/// odd argument count is rejected.
pub const APPROVAL_PROGRAM: &str = r#"#pragma version 5
txn ApplicationID
int 0
==
bnz allow

txn Sender
global CreatorAddress
==
bz reject

txn OnCompletion
int DeleteApplication
==
bnz allow

txn OnCompletion
int NoOp
==
bz reject

txn NumAppArgs
int 0
==
bnz allow

int 0
store 0

txn Note
byte "put"
==
bnz put_loop

txn Note
byte "delete"
==
bnz delete_loop

b reject

put_loop:
load 0
txn NumAppArgs
>=
bnz allow
load 0
txnas ApplicationArgs
load 0
int 1
+
txnas ApplicationArgs
app_global_put
load 0
int 2
+
store 0
b put_loop

delete_loop:
load 0
txn NumAppArgs
>=
bnz allow
load 0
txnas ApplicationArgs
app_global_del
load 0
int 1
+
store 0
b delete_loop

allow:
int 1
return

reject:
int 0
return
"#;

/// Clear-state program: always accept
pub const CLEAR_PROGRAM: &str = "#pragma version 5\nint 1\nreturn\n";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_share_version() {
        assert!(APPROVAL_PROGRAM.starts_with("#pragma version 5"));
        assert!(CLEAR_PROGRAM.starts_with("#pragma version 5"));
    }

    #[test]
    fn test_modes_match_machine() {
        let put = format!("byte \"{}\"", std::str::from_utf8(crate::MODE_PUT).unwrap());
        let delete = format!("byte \"{}\"", std::str::from_utf8(crate::MODE_DELETE).unwrap());
        assert!(APPROVAL_PROGRAM.contains(&put));
        assert!(APPROVAL_PROGRAM.contains(&delete));
    }
}
