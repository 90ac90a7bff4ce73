use super::error::UsageError;

pub const DEFAULT_CAP_FACTOR: f64 = 1.4;

pub const USAGE: &str =
    "Usage: transform gate_clone <float: max-cap-factor> <boolean: clone-largest-only>";

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GateCloneArgs {
    /// Multiplier applied to each driver's target load.
    pub cap_factor: f64,
    /// Only clone drivers already using the largest equivalent cell.
    pub clone_largest_only: bool,
}

impl Default for GateCloneArgs {
    fn default() -> Self {
        Self {
            cap_factor: DEFAULT_CAP_FACTOR,
            clone_largest_only: false,
        }
    }
}

impl GateCloneArgs {
    /// Parses `[max-cap-factor [clone-largest-only]]`.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Self, UsageError> {
        if args.len() > 2 {
            return Err(UsageError::TooManyArguments(args.len()));
        }
        let mut parsed = Self::default();
        if let Some(arg) = args.first() {
            parsed.cap_factor = parse_number(arg.as_ref())?;
        }
        if let Some(arg) = args.get(1) {
            parsed.clone_largest_only = parse_bool(arg.as_ref())?;
        }
        Ok(parsed)
    }
}

fn parse_number(arg: &str) -> Result<f64, UsageError> {
    arg.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| UsageError::ExpectedNumber(arg.to_string()))
}

fn parse_bool(arg: &str) -> Result<bool, UsageError> {
    match arg.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(UsageError::ExpectedBoolean(arg.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! parse_ok {
        ($($name:ident: [$($arg:expr),*] => ($cap:expr, $largest:expr),)*) => {
            $(
                paste::paste! {
                    #[test]
                    fn [<test_parse_ $name>]() {
                        let args: Vec<&str> = vec![$($arg),*];
                        let parsed = GateCloneArgs::parse(&args).unwrap();
                        assert_eq!(parsed.cap_factor, $cap);
                        assert_eq!(parsed.clone_largest_only, $largest);
                    }
                }
            )*
        };
    }

    macro_rules! parse_err {
        ($($name:ident: [$($arg:expr),*] => $err:pat,)*) => {
            $(
                paste::paste! {
                    #[test]
                    fn [<test_reject_ $name>]() {
                        let args: Vec<&str> = vec![$($arg),*];
                        assert!(matches!(GateCloneArgs::parse(&args), Err($err)));
                    }
                }
            )*
        };
    }

    parse_ok! {
        defaults: [] => (1.4, false),
        cap_only: ["2.0"] => (2.0, false),
        bool_true: ["2.0", "true"] => (2.0, true),
        bool_one: ["2.0", "1"] => (2.0, true),
        bool_upper: ["0.5", "TRUE"] => (0.5, true),
        bool_false: ["3", "False"] => (3.0, false),
        bool_zero: ["1e1", "0"] => (10.0, false),
    }

    parse_err! {
        not_a_number: ["abc"] => UsageError::ExpectedNumber(_),
        trailing_garbage: ["1.4x"] => UsageError::ExpectedNumber(_),
        leading_space: [" 1.4"] => UsageError::ExpectedNumber(_),
        infinite: ["inf"] => UsageError::ExpectedNumber(_),
        bad_bool: ["1.4", "yes"] => UsageError::ExpectedBoolean(_),
        too_many: ["1.0", "2.0", "3.0"] => UsageError::TooManyArguments(3),
    }
}
