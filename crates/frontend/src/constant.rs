//! Compile-time constants and constant folding.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub fn from_keyword(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => PrimitiveType::Boolean,
            "byte" => PrimitiveType::Byte,
            "char" => PrimitiveType::Char,
            "short" => PrimitiveType::Short,
            "int" => PrimitiveType::Int,
            "long" => PrimitiveType::Long,
            "float" => PrimitiveType::Float,
            "double" => PrimitiveType::Double,
            _ => return None,
        })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }
}

/// A folded constant value, tagged with its Java type.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

/// Numeric category after binary numeric promotion.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Int,
    Long,
    Float,
    Double,
}

impl Constant {
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::Boolean(_) => "boolean",
            Constant::Byte(_) => "byte",
            Constant::Char(_) => "char",
            Constant::Short(_) => "short",
            Constant::Int(_) => "int",
            Constant::Long(_) => "long",
            Constant::Float(_) => "float",
            Constant::Double(_) => "double",
            Constant::String(_) => "java.lang.String",
        }
    }

    fn rank(&self) -> Option<Rank> {
        match self {
            Constant::Byte(_) | Constant::Char(_) | Constant::Short(_) | Constant::Int(_) => {
                Some(Rank::Int)
            }
            Constant::Long(_) => Some(Rank::Long),
            Constant::Float(_) => Some(Rank::Float),
            Constant::Double(_) => Some(Rank::Double),
            Constant::Boolean(_) | Constant::String(_) => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        Some(match self {
            Constant::Byte(v) => i64::from(*v),
            Constant::Char(c) => i64::from(u32::from(*c)),
            Constant::Short(v) => i64::from(*v),
            Constant::Int(v) => i64::from(*v),
            Constant::Long(v) => *v,
            Constant::Float(v) => *v as i64,
            Constant::Double(v) => *v as i64,
            _ => return None,
        })
    }

    fn as_f64(&self) -> Option<f64> {
        Some(match self {
            Constant::Float(v) => f64::from(*v),
            Constant::Double(v) => *v,
            other => other.as_i64()? as f64,
        })
    }

    /// Applies a primitive conversion, as a cast or an assignment to a field
    /// of type `to` would.
    pub fn convert(&self, to: PrimitiveType) -> Option<Constant> {
        if let Constant::Boolean(b) = self {
            return (to == PrimitiveType::Boolean).then_some(Constant::Boolean(*b));
        }
        if matches!(self, Constant::String(_)) || to == PrimitiveType::Boolean {
            return None;
        }
        Some(match to {
            PrimitiveType::Byte => Constant::Byte(self.as_i64()? as i8),
            PrimitiveType::Short => Constant::Short(self.as_i64()? as i16),
            PrimitiveType::Char => Constant::Char(char::from_u32(self.as_i64()? as u16 as u32)?),
            PrimitiveType::Int => Constant::Int(self.as_i64()? as i32),
            PrimitiveType::Long => Constant::Long(self.as_i64()?),
            PrimitiveType::Float => Constant::Float(self.as_f64()? as f32),
            PrimitiveType::Double => Constant::Double(self.as_f64()?),
            PrimitiveType::Boolean => return None,
        })
    }

    /// Folds a unary operator.
    pub fn unary(op: &str, operand: &Constant) -> Option<Constant> {
        match (op, operand) {
            ("!", Constant::Boolean(b)) => Some(Constant::Boolean(!b)),
            ("+", c) => {
                c.rank()?;
                Some(promote_unary(c))
            }
            ("-", c) => Some(match promote_unary(c) {
                Constant::Int(v) => Constant::Int(v.wrapping_neg()),
                Constant::Long(v) => Constant::Long(v.wrapping_neg()),
                Constant::Float(v) => Constant::Float(-v),
                Constant::Double(v) => Constant::Double(-v),
                _ => return None,
            }),
            ("~", c) => Some(match promote_unary(c) {
                Constant::Int(v) => Constant::Int(!v),
                Constant::Long(v) => Constant::Long(!v),
                _ => return None,
            }),
            _ => None,
        }
    }

    /// Folds a binary operator. Returns `None` when the expression is not a
    /// constant expression (including integer division by zero).
    pub fn binary(op: &str, left: &Constant, right: &Constant) -> Option<Constant> {
        if op == "+" && (matches!(left, Constant::String(_)) || matches!(right, Constant::String(_)))
        {
            return Some(Constant::String(format!("{left}{right}")));
        }
        if let (Constant::Boolean(l), Constant::Boolean(r)) = (left, right) {
            return Some(Constant::Boolean(match op {
                "&&" | "&" => *l && *r,
                "||" | "|" => *l || *r,
                "^" | "!=" => l != r,
                "==" => l == r,
                _ => return None,
            }));
        }
        if let (Constant::String(l), Constant::String(r)) = (left, right) {
            return match op {
                "==" => Some(Constant::Boolean(l == r)),
                "!=" => Some(Constant::Boolean(l != r)),
                _ => None,
            };
        }
        if matches!(op, "<<" | ">>" | ">>>") {
            return shift(op, left, right);
        }
        let rank = left.rank()?.max(right.rank()?);
        match rank {
            Rank::Int | Rank::Long => {
                let (l, r) = (left.as_i64()?, right.as_i64()?);
                let folded = match op {
                    "+" => l.wrapping_add(r),
                    "-" => l.wrapping_sub(r),
                    "*" => l.wrapping_mul(r),
                    "/" => {
                        if r == 0 {
                            return None;
                        }
                        l.wrapping_div(r)
                    }
                    "%" => {
                        if r == 0 {
                            return None;
                        }
                        l.wrapping_rem(r)
                    }
                    "&" => l & r,
                    "|" => l | r,
                    "^" => l ^ r,
                    _ => return compare(op, l as f64, r as f64),
                };
                Some(if rank == Rank::Int {
                    Constant::Int(folded as i32)
                } else {
                    Constant::Long(folded)
                })
            }
            Rank::Float | Rank::Double => {
                let (l, r) = (left.as_f64()?, right.as_f64()?);
                let folded = match op {
                    "+" => l + r,
                    "-" => l - r,
                    "*" => l * r,
                    "/" => l / r,
                    "%" => l % r,
                    _ => return compare(op, l, r),
                };
                Some(if rank == Rank::Float {
                    Constant::Float(folded as f32)
                } else {
                    Constant::Double(folded)
                })
            }
        }
    }
}

fn promote_unary(c: &Constant) -> Constant {
    match c {
        Constant::Byte(_) | Constant::Char(_) | Constant::Short(_) => {
            Constant::Int(c.as_i64().unwrap_or_default() as i32)
        }
        other => other.clone(),
    }
}

fn compare(op: &str, l: f64, r: f64) -> Option<Constant> {
    Some(Constant::Boolean(match op {
        "==" => l == r,
        "!=" => l != r,
        "<" => l < r,
        "<=" => l <= r,
        ">" => l > r,
        ">=" => l >= r,
        _ => return None,
    }))
}

fn shift(op: &str, left: &Constant, right: &Constant) -> Option<Constant> {
    let distance = right.as_i64()?;
    match promote_unary(left) {
        Constant::Int(v) => {
            let d = (distance & 0x1f) as u32;
            Some(Constant::Int(match op {
                "<<" => v.wrapping_shl(d),
                ">>" => v.wrapping_shr(d),
                _ => ((v as u32) >> d) as i32,
            }))
        }
        Constant::Long(v) => {
            let d = (distance & 0x3f) as u32;
            Some(Constant::Long(match op {
                "<<" => v.wrapping_shl(d),
                ">>" => v.wrapping_shr(d),
                _ => ((v as u64) >> d) as i64,
            }))
        }
        _ => None,
    }
}

impl fmt::Display for Constant {
    /// Renders the value the way string concatenation would.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Boolean(v) => write!(f, "{v}"),
            Constant::Byte(v) => write!(f, "{v}"),
            Constant::Char(v) => write!(f, "{v}"),
            Constant::Short(v) => write!(f, "{v}"),
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Long(v) => write!(f, "{v}"),
            Constant::Float(v) => write_floating(f, f64::from(*v)),
            Constant::Double(v) => write_floating(f, *v),
            Constant::String(v) => f.write_str(v),
        }
    }
}

fn write_floating(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e7 {
        write!(f, "{v:.1}")
    } else if v.is_nan() {
        f.write_str("NaN")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        write!(f, "{v}")
    }
}

/// Parses the text of a numeric literal node.
pub fn parse_integer_literal(text: &str) -> Option<Constant> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let (digits, is_long) = match cleaned.strip_suffix(['l', 'L']) {
        Some(d) => (d.to_string(), true),
        None => (cleaned, false),
    };
    let lower = digits.to_ascii_lowercase();
    let value = if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()?
    } else if lower.len() > 1 && lower.starts_with('0') {
        u64::from_str_radix(&lower[1..], 8).ok()?
    } else {
        lower.parse::<u64>().ok()?
    };
    Some(if is_long {
        Constant::Long(value as i64)
    } else {
        Constant::Int(value as u32 as i32)
    })
}

pub fn parse_floating_literal(text: &str) -> Option<Constant> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    if let Some(f) = cleaned.strip_suffix(['f', 'F']) {
        return f.parse::<f32>().ok().map(Constant::Float);
    }
    let d = cleaned.strip_suffix(['d', 'D']).unwrap_or(&cleaned);
    d.parse::<f64>().ok().map(Constant::Double)
}

/// Decodes the body of a string or character literal (quotes already
/// stripped).
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('s') => out.push(' '),
            Some('u') => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                let max_digits = if d <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) => {
                            value = value * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if let Some(ch) = char::from_u32(value) {
                    out.push(ch);
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
