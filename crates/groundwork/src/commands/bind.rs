use anyhow::{ensure, Context, Result};

use groundwork_core::types::DeploymentOutputs;
use groundwork_provision::IdentityBinder;

use crate::cli::BindArgs;
use crate::output;

pub async fn run(args: BindArgs) -> Result<()> {
    let outputs = resolve_outputs(&args)?;
    output::info(&format!(
        "binding {} principal(s) as external database users",
        outputs.principal_ids.len()
    ));

    let binder = IdentityBinder::sql_server();
    binder.bind_all(&outputs).await?;

    output::success("all principals bound");
    Ok(())
}

/// Build the binding inputs from an outputs file, explicit flags, or both.
/// Flags override the file field-by-field.
fn resolve_outputs(args: &BindArgs) -> Result<DeploymentOutputs> {
    if let Some(path) = &args.outputs {
        let mut outputs = DeploymentOutputs::from_file(path.as_std_path())?;
        if let Some(connection_string) = &args.connection_string {
            outputs.connection_string = connection_string.clone();
        }
        if !args.principals.is_empty() {
            outputs.principal_ids = args.principals.clone();
        }
        Ok(outputs)
    } else {
        let connection_string = args
            .connection_string
            .clone()
            .context("--connection-string is required without --outputs")?;
        ensure!(
            !args.principals.is_empty(),
            "at least one --principal is required without --outputs"
        );
        Ok(DeploymentOutputs {
            connection_string,
            principal_ids: args.principals.clone(),
        })
    }
}
