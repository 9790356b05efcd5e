/// Fixed symbolic token of an operator node.
///
/// Operators syn may add later have no token; they contribute nothing, which is always safe.
pub(crate) trait OperatorToken {
    fn token(&self) -> Option<&'static str>;
}

impl OperatorToken for syn::BinOp {
    fn token(&self) -> Option<&'static str> {
        use syn::BinOp::*;
        Some(match self {
            Add(..) => "+",
            Sub(..) => "-",
            Mul(..) => "*",
            Div(..) => "/",
            Rem(..) => "%",
            And(..) => "&&",
            Or(..) => "||",
            BitXor(..) => "^",
            BitAnd(..) => "&",
            BitOr(..) => "|",
            Shl(..) => "<<",
            Shr(..) => ">>",
            Eq(..) => "==",
            Lt(..) => "<",
            Le(..) => "<=",
            Ne(..) => "!=",
            Ge(..) => ">=",
            Gt(..) => ">",
            AddAssign(..) => "+=",
            SubAssign(..) => "-=",
            MulAssign(..) => "*=",
            DivAssign(..) => "/=",
            RemAssign(..) => "%=",
            BitXorAssign(..) => "^=",
            BitAndAssign(..) => "&=",
            BitOrAssign(..) => "|=",
            ShlAssign(..) => "<<=",
            ShrAssign(..) => ">>=",
            _ => return None,
        })
    }
}

impl OperatorToken for syn::UnOp {
    fn token(&self) -> Option<&'static str> {
        use syn::UnOp::*;
        Some(match self {
            Deref(..) => "*x",
            Not(..) => "!",
            Neg(..) => "-x",
            _ => return None,
        })
    }
}

impl OperatorToken for syn::RangeLimits {
    fn token(&self) -> Option<&'static str> {
        Some(match self {
            syn::RangeLimits::HalfOpen(..) => "..",
            syn::RangeLimits::Closed(..) => "..=",
        })
    }
}

pub(crate) const ASSIGN: &str = "=";
pub(crate) const REF: &str = "&x";
pub(crate) const REF_MUT: &str = "&mut x";
pub(crate) const TRY: &str = "?";
pub(crate) const CAST: &str = "as";
pub(crate) const INDEX: &str = "[]";
pub(crate) const AWAIT: &str = "await";

/// Every operator token a run of joint punctuation in an unparsed token stream could stand for.
///
/// Prefix and infix readings share symbols (`-` vs `-x`, `&` vs `&x`), and without a parse
/// there is no telling them apart, so all readings are returned.
pub(crate) fn punct_tokens(symbol: &str) -> &'static [&'static str] {
    match symbol {
        "+" => &["+"],
        "-" => &["-", "-x"],
        "*" => &["*", "*x"],
        "/" => &["/"],
        "%" => &["%"],
        "&&" => &["&&", REF, REF_MUT],
        "||" => &["||"],
        "^" => &["^"],
        "&" => &["&", REF, REF_MUT],
        "|" => &["|"],
        "<<" => &["<<"],
        ">>" => &[">>"],
        "==" => &["=="],
        "<" => &["<"],
        "<=" => &["<="],
        "!=" => &["!="],
        ">=" => &[">="],
        ">" => &[">"],
        "+=" => &["+="],
        "-=" => &["-="],
        "*=" => &["*="],
        "/=" => &["/="],
        "%=" => &["%="],
        "^=" => &["^="],
        "&=" => &["&="],
        "|=" => &["|="],
        "<<=" => &["<<="],
        ">>=" => &[">>="],
        "!" => &["!"],
        "=" => &[ASSIGN],
        "?" => &[TRY],
        ".." => &[".."],
        "..=" => &["..="],
        _ => &[],
    }
}
