use periphlink_router::{BuiltinCommand, DESCRIPTION_SEPARATOR};

use crate::cmd::DescribeArgs;
use crate::exit::{registry_error, CliResult, SUCCESS};
use crate::output::{print_description, Description, Entry, OutputFormat};
use crate::sim::simulated_router;

pub fn run(args: DescribeArgs, format: OutputFormat) -> CliResult<i32> {
    let router = simulated_router(args.board.config(), &args.board.libraries)
        .map_err(|err| registry_error("library registration failed", err))?;

    let payload = router.describe();
    let description = Description {
        platform: router.config().platform_id.clone(),
        diagnostics: router.config().diagnostics_enabled,
        libraries: router
            .registry()
            .names()
            .map(|(id, name)| Entry {
                id,
                name: name.to_string(),
            })
            .collect(),
        commands: BuiltinCommand::ALL
            .iter()
            .map(|command| Entry {
                id: command.id(),
                name: command.name().to_string(),
            })
            .collect(),
        payload: hex_groups(&payload),
    };

    print_description(&description, format);
    Ok(SUCCESS)
}

/// Hex with a space after every description separator, so the fields of the
/// payload stay readable.
fn hex_groups(payload: &[u8]) -> String {
    payload
        .split_inclusive(|&byte| byte == DESCRIPTION_SEPARATOR)
        .map(hex::encode)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_grouped_by_separator() {
        assert_eq!(
            hex_groups(b"Uno;\x00;\x00I2C;\x01Servo\x00"),
            "556e6f3b 003b 004932433b 01536572766f00"
        );
    }
}
