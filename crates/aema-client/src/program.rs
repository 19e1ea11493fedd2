//! Program compilation

use base64::{engine::general_purpose::STANDARD, Engine as _};

use aema_core::{AemaError, AemaResult};
use aema_program::{APPROVAL_PROGRAM, CLEAR_PROGRAM};

use crate::LedgerClient;

/// Compile TEAL source on the node and decode the returned program bytes
pub async fn compile_program<C>(client: &C, source: &str) -> AemaResult<Vec<u8>>
where
    C: LedgerClient + ?Sized,
{
    let response = client.compile_program(source.as_bytes()).await?;
    let program = STANDARD
        .decode(response.result.as_bytes())
        .map_err(|e| AemaError::Compile(format!("bad program encoding: {e}")))?;
    if program.is_empty() {
        return Err(AemaError::Compile("node returned an empty program".into()));
    }
    tracing::trace!(hash = %response.hash, len = program.len(), "program compiled");
    Ok(program)
}

/// Compiled approval and clear programs of the oracle application
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramArtifact {
    pub approval: Vec<u8>,
    pub clear: Vec<u8>,
}

impl ProgramArtifact {
    pub async fn compile<C>(client: &C) -> AemaResult<Self>
    where
        C: LedgerClient + ?Sized,
    {
        let approval = compile_program(client, APPROVAL_PROGRAM).await?;
        let clear = compile_program(client, CLEAR_PROGRAM).await?;
        Ok(ProgramArtifact { approval, clear })
    }
}
