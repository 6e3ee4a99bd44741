//! Conversion of literal configuration values into the primitive types constructor
//! parameters and properties declare.
//!
//! Bean references never reach a [`Converter`], they are resolved before conversion.

use std::{fmt::Display, num::IntErrorKind};

use thiserror::Error;

/// Target type of a literal value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    I128,
    Isize,
    U8,
    U16,
    U32,
    U64,
    U128,
    Usize,
    F32,
    F64,
    String,
}
impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Char => "char",
            ValueType::I8 => "i8",
            ValueType::I16 => "i16",
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::I128 => "i128",
            ValueType::Isize => "isize",
            ValueType::U8 => "u8",
            ValueType::U16 => "u16",
            ValueType::U32 => "u32",
            ValueType::U64 => "u64",
            ValueType::U128 => "u128",
            ValueType::Usize => "usize",
            ValueType::F32 => "f32",
            ValueType::F64 => "f64",
            ValueType::String => "String",
        }
    }
}
impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A converted literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    Usize(usize),
    F32(f32),
    F64(f64),
    String(String),
}

/// Errors while converting a literal value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The text is not a valid value of the target type
    #[error("cannot convert \"{raw}\" to {target}: {reason}")]
    Invalid {
        raw: String,
        target: ValueType,
        reason: String,
    },
    /// The number does not fit into the target type
    #[error("\"{raw}\" is out of range for {target}")]
    OutOfRange { raw: String, target: ValueType },
    /// A literal was declared where a bean is required
    #[error("a literal value \"{raw}\" cannot be injected where bean '{required}' is required")]
    NotABean { raw: String, required: &'static str },
}

/// Converts literal text into a value of a primitive target type
pub trait Converter: Send + Sync {
    fn convert(&self, raw: &str, target: ValueType) -> Result<Literal, ConversionError>;
}

/// Converter for all primitive types.
///
/// - bool: `true/false`, `yes/no`, `on/off`, `1/0`, ignoring case
/// - integers: decimal or hex (`0x`, `#`), range checked
/// - surrounding whitespace is ignored for everything but `String` and `char`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl Converter for DefaultConverter {
    fn convert(&self, raw: &str, target: ValueType) -> Result<Literal, ConversionError> {
        let invalid = |reason: &str| ConversionError::Invalid {
            raw: raw.to_string(),
            target,
            reason: reason.to_string(),
        };
        let out_of_range = || ConversionError::OutOfRange {
            raw: raw.to_string(),
            target,
        };

        macro_rules! integer {
            ($variant:ident, $ty:ty) => {{
                let wide = match parse_integer(raw) {
                    Ok((negative, magnitude)) => signed(negative, magnitude),
                    Err(IntegerError::Invalid(reason)) => return Err(invalid(reason)),
                    Err(IntegerError::TooLarge) => None,
                };
                wide.and_then(|wide| <$ty>::try_from(wide).ok())
                    .map(Literal::$variant)
                    .ok_or_else(out_of_range)
            }};
        }

        match target {
            ValueType::String => Ok(Literal::String(raw.to_string())),
            ValueType::Char => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Literal::Char(c)),
                    _ => Err(invalid("expected exactly one character")),
                }
            }
            ValueType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Literal::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Literal::Bool(false)),
                _ => Err(invalid("expected true/false, yes/no, on/off or 1/0")),
            },
            ValueType::I8 => integer!(I8, i8),
            ValueType::I16 => integer!(I16, i16),
            ValueType::I32 => integer!(I32, i32),
            ValueType::I64 => integer!(I64, i64),
            ValueType::I128 => integer!(I128, i128),
            ValueType::Isize => integer!(Isize, isize),
            ValueType::U8 => integer!(U8, u8),
            ValueType::U16 => integer!(U16, u16),
            ValueType::U32 => integer!(U32, u32),
            ValueType::U64 => integer!(U64, u64),
            ValueType::Usize => integer!(Usize, usize),
            ValueType::U128 => match parse_integer(raw) {
                Ok((true, magnitude)) if magnitude != 0 => Err(out_of_range()),
                Ok((_, magnitude)) => Ok(Literal::U128(magnitude)),
                Err(IntegerError::Invalid(reason)) => Err(invalid(reason)),
                Err(IntegerError::TooLarge) => Err(out_of_range()),
            },
            ValueType::F32 => raw
                .trim()
                .parse::<f32>()
                .map(Literal::F32)
                .map_err(|e| invalid(&e.to_string())),
            ValueType::F64 => raw
                .trim()
                .parse::<f64>()
                .map(Literal::F64)
                .map_err(|e| invalid(&e.to_string())),
        }
    }
}

fn hex_digits(text: &str) -> Option<&str> {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('#'))
}

enum IntegerError {
    Invalid(&'static str),
    /// Does not even fit a `u128`
    TooLarge,
}

/// Parses a decimal or hex integer into its sign and magnitude.
///
/// At most one sign is accepted, and only in front of the hex prefix.
fn parse_integer(raw: &str) -> Result<(bool, u128), IntegerError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IntegerError::Invalid("empty value"));
    }

    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (digits, radix) = match hex_digits(unsigned) {
        Some(digits) => (digits, 16),
        None => (unsigned, 10),
    };

    // from_str_radix would accept another sign here
    if !digits.starts_with(|c: char| c.is_digit(radix)) {
        return Err(IntegerError::Invalid("not a valid integer"));
    }

    let magnitude = u128::from_str_radix(digits, radix).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => IntegerError::TooLarge,
        _ => IntegerError::Invalid("not a valid integer"),
    })?;
    Ok((negative, magnitude))
}

/// `None` if the value does not fit an `i128`
fn signed(negative: bool, magnitude: u128) -> Option<i128> {
    if negative {
        0i128.checked_sub_unsigned(magnitude)
    } else {
        i128::try_from(magnitude).ok()
    }
}

/// Types that can be taken out of a converted [`Literal`]
pub trait FromLiteral: Sized + 'static {
    const VALUE_TYPE: ValueType;

    fn from_literal(literal: &Literal) -> Option<Self>;
}

macro_rules! from_literal {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromLiteral for $ty {
                const VALUE_TYPE: ValueType = ValueType::$variant;

                fn from_literal(literal: &Literal) -> Option<Self> {
                    match literal {
                        Literal::$variant(value) => Some(value.clone()),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_literal!(
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    usize => Usize,
    f32 => F32,
    f64 => F64,
    String => String,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(raw: &str, target: ValueType) -> Result<Literal, ConversionError> {
        DefaultConverter.convert(raw, target)
    }

    #[test]
    fn integers() {
        assert_eq!(convert(" 42 ", ValueType::I32), Ok(Literal::I32(42)));
        assert_eq!(convert("-7", ValueType::I64), Ok(Literal::I64(-7)));
        assert_eq!(convert("0xff", ValueType::U8), Ok(Literal::U8(255)));
        assert_eq!(convert("#10", ValueType::U16), Ok(Literal::U16(16)));
        assert_eq!(
            convert("256", ValueType::U8),
            Err(ConversionError::OutOfRange {
                raw: "256".into(),
                target: ValueType::U8
            })
        );
        assert!(matches!(
            convert("-1", ValueType::Usize),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(matches!(
            convert("twelve", ValueType::I32),
            Err(ConversionError::Invalid { .. })
        ));
        assert!(matches!(
            convert("", ValueType::I32),
            Err(ConversionError::Invalid { .. })
        ));
        assert_eq!(
            convert("340282366920938463463374607431768211455", ValueType::U128),
            Ok(Literal::U128(u128::MAX))
        );
    }

    #[test]
    fn integers_take_at_most_one_sign() {
        for raw in ["--5", "-+5", "+-5", "++5", "0x-5", "-0x+5", "#-1", "- 5"] {
            assert!(
                matches!(convert(raw, ValueType::I32), Err(ConversionError::Invalid { .. })),
                "{raw} should be rejected"
            );
            assert!(
                matches!(convert(raw, ValueType::U128), Err(ConversionError::Invalid { .. })),
                "{raw} should be rejected"
            );
        }
        assert_eq!(convert("+5", ValueType::I32), Ok(Literal::I32(5)));
        assert_eq!(convert("-0x10", ValueType::I32), Ok(Literal::I32(-16)));
        assert_eq!(convert("-0", ValueType::U128), Ok(Literal::U128(0)));
    }

    #[test]
    fn integer_bounds() {
        assert_eq!(
            convert(&i128::MIN.to_string(), ValueType::I128),
            Ok(Literal::I128(i128::MIN))
        );
        assert_eq!(
            convert(&i128::MAX.to_string(), ValueType::I128),
            Ok(Literal::I128(i128::MAX))
        );
        assert_eq!(convert("-128", ValueType::I8), Ok(Literal::I8(i8::MIN)));
        for raw in [
            "-170141183460469231731687303715884105729",
            "170141183460469231731687303715884105728",
            "340282366920938463463374607431768211456",
        ] {
            assert!(
                matches!(convert(raw, ValueType::I128), Err(ConversionError::OutOfRange { .. })),
                "{raw} should be out of range"
            );
        }
        assert!(matches!(
            convert("340282366920938463463374607431768211456", ValueType::U128),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(matches!(
            convert("-1", ValueType::U128),
            Err(ConversionError::OutOfRange { .. })
        ));
    }

    #[test]
    fn booleans() {
        for raw in ["true", "YES", "on", "1"] {
            assert_eq!(convert(raw, ValueType::Bool), Ok(Literal::Bool(true)));
        }
        for raw in ["False", "no", "OFF", "0"] {
            assert_eq!(convert(raw, ValueType::Bool), Ok(Literal::Bool(false)));
        }
        assert!(convert("maybe", ValueType::Bool).is_err());
    }

    #[test]
    fn floats_chars_strings() {
        assert_eq!(convert("2.5", ValueType::F64), Ok(Literal::F64(2.5)));
        assert_eq!(convert("x", ValueType::Char), Ok(Literal::Char('x')));
        assert!(convert("xy", ValueType::Char).is_err());
        assert_eq!(
            convert(" keep spaces ", ValueType::String),
            Ok(Literal::String(" keep spaces ".into()))
        );
    }

    #[test]
    fn from_literal_matches_variant() {
        assert_eq!(i32::from_literal(&Literal::I32(3)), Some(3));
        assert_eq!(i64::from_literal(&Literal::I32(3)), None);
        assert_eq!(<String as FromLiteral>::VALUE_TYPE, ValueType::String);
    }
}
