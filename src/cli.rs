use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::loader::Overrides;
use crate::machine::MachineVariant;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub files: Vec<PathBuf>,
    pub overrides: Overrides,
    /// Lowercase/uppercase character set instead of uppercase/graphics.
    pub text_mode: bool,
    pub columns: Option<u8>,
    /// Snapshot to continue from instead of starting the images afresh.
    pub resume: Option<PathBuf>,
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {} <filenames> [-start <num>] [-startind <num>] [-machine <name>] \
         [-text|-graphics] [-columns <num>] [-resume <snapshot>]\n\
         Numbers are decimal, $hex or 0xhex. Machines: pet, pet4, vic20, c64, ted, c128, c65.",
        program
    )
}

/// Splits a leading decimal, `$`-hex or `0x`-hex number off `s`.
pub(crate) fn split_number(s: &str) -> Option<(u16, &str)> {
    let (digits, radix) = if let Some(rest) = s.strip_prefix('$') {
        (rest, 16)
    } else if let Some(rest) = s.strip_prefix("0x") {
        (rest, 16)
    } else {
        (s, 10)
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = u16::from_str_radix(&digits[..end], radix).ok()?;
    Some((value, &digits[end..]))
}

pub fn parse_num(s: &str) -> Option<u16> {
    match split_number(s) {
        Some((value, "")) => Some(value),
        _ => None,
    }
}

pub fn parse_args<I>(program: &str, args: I) -> Result<Options>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut options = Options::default();

    let value_of = |name: &str, value: Option<String>| -> Result<String> {
        value.ok_or_else(|| Error::Usage(format!("{}: {} requires argument!", program, name)))
    };
    let number = |name: &str, value: String| -> Result<u16> {
        parse_num(&value).ok_or_else(|| {
            Error::Usage(format!("{}: {}: invalid number \"{}\"", program, name, value))
        })
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-start" => {
                let v = value_of(arg.as_str(), args.next())?;
                options.overrides.start = Some(number(arg.as_str(), v)?);
            }
            "-startind" => {
                let v = value_of(arg.as_str(), args.next())?;
                options.overrides.start_indirect = Some(number(arg.as_str(), v)?);
            }
            "-machine" => {
                let v = value_of(arg.as_str(), args.next())?;
                let machine = v
                    .parse::<MachineVariant>()
                    .map_err(|msg| Error::Usage(format!("{}: {}", program, msg)))?;
                options.overrides.machine = Some(machine);
            }
            "-resume" => {
                let v = value_of(arg.as_str(), args.next())?;
                options.resume = Some(PathBuf::from(v));
            }
            "-text" => options.text_mode = true,
            "-graphics" => options.text_mode = false,
            "-columns" => {
                let v = value_of(arg.as_str(), args.next())?;
                let n = number(arg.as_str(), v)?;
                let columns = u8::try_from(n).map_err(|_| {
                    Error::Usage(format!("{}: -columns must be at most 255", program))
                })?;
                options.columns = Some(columns);
            }
            s if s.starts_with('-') => {
                return Err(Error::Usage(format!("{}: Unknown option: {}", program, s)));
            }
            _ => options.files.push(PathBuf::from(&arg)),
        }
    }

    if options.files.is_empty() && options.resume.is_none() {
        return Err(Error::Usage(usage(program)));
    }
    Ok(options)
}
