use periphlink_frame::unpack;

use crate::cmd::UnpackArgs;
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_unpacked, OutputFormat};

pub fn run(args: UnpackArgs, format: OutputFormat) -> CliResult<i32> {
    let packed = parse_hex(&args.packed)?;
    let count = args.count.unwrap_or(packed.len() * 7 / 8);

    let values = unpack(count, &packed).map_err(|err| frame_error("unpack failed", err))?;

    print_unpacked(&args.packed, &values, format);
    Ok(SUCCESS)
}

/// Accepts runs of hex digits separated by whitespace, commas or colons,
/// each optionally prefixed with `0x`.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    hex::decode(&digits)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex input: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_spellings() {
        assert_eq!(parse_hex("200400").unwrap(), vec![0x20, 0x04, 0x00]);
        assert_eq!(parse_hex("0x20, 0x04, 0x00").unwrap(), vec![0x20, 0x04, 0x00]);
        assert_eq!(parse_hex("20:04 00").unwrap(), vec![0x20, 0x04, 0x00]);
    }

    #[test]
    fn odd_digit_count_is_invalid_data() {
        let err = parse_hex("2004 0").unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
