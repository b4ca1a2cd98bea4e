use std::collections::BTreeSet;

use crate::cli::{OutputFormat, ValidateArgs, read_config};
use crate::error::{CliError, CliResult};
use crate::output::format_config;
use crate::template::TemplatePolicy;

pub(crate) fn handle_validate(args: &ValidateArgs, format: OutputFormat) -> CliResult<()> {
    let config = read_config(&args.config)?;
    let policy = TemplatePolicy::from_config(&config.paths)
        .map_err(|err| CliError::validation(format!("invalid path template: {err}")))?;

    print!("{}", format_config(&config, format)?);
    match format {
        OutputFormat::Json => println!(),
        OutputFormat::Table => {
            let fields: BTreeSet<&str> = policy.fields().collect();
            let listed: Vec<&str> = fields.into_iter().collect();
            println!("# manifest fields used: {}", listed.join(", "));
        }
    }
    Ok(())
}
