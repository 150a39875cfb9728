use crate::error::ScriptError;
use pipespector_core::{MutationError, Mutator, SlotName, Unit};
use regex::bytes::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Upper,
    Lower,
    Trim,
    Sub,
}

impl Function {
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "upper" => Some(Function::Upper),
            "lower" => Some(Function::Lower),
            "trim" => Some(Function::Trim),
            "sub" => Some(Function::Sub),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Upper => "upper",
            Function::Lower => "lower",
            Function::Trim => "trim",
            Function::Sub => "sub",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::Sub => 3,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Slot(SlotName),
    Literal(Vec<u8>),
    Concat(Vec<Expr>),
    Call { function: Function, args: Vec<Expr> },
}

impl Expr {
    pub fn eval(&self, current: Option<&Unit>, previous: Option<&Unit>) -> Result<Vec<u8>, ScriptError> {
        match self {
            Expr::Slot(slot) => {
                let value = match slot {
                    SlotName::Current => current,
                    SlotName::Previous => previous,
                };
                value
                    .map(|u| u.as_bytes().to_vec())
                    .ok_or(ScriptError::EmptySlot(*slot))
            }
            Expr::Literal(bytes) => Ok(bytes.clone()),
            Expr::Concat(parts) => {
                let mut out = Vec::new();
                for part in parts {
                    out.extend(part.eval(current, previous)?);
                }
                Ok(out)
            }
            Expr::Call { function, args } => {
                let values = args
                    .iter()
                    .map(|a| a.eval(current, previous))
                    .collect::<Result<Vec<_>, _>>()?;
                call(*function, values)
            }
        }
    }
}

fn call(function: Function, args: Vec<Vec<u8>>) -> Result<Vec<u8>, ScriptError> {
    let mut args = args.into_iter();
    let mut arg = || args.next().unwrap_or_default();

    match function {
        Function::Upper => Ok(arg().to_ascii_uppercase()),
        Function::Lower => Ok(arg().to_ascii_lowercase()),
        Function::Trim => Ok(arg().trim_ascii().to_vec()),
        Function::Sub => {
            let input = arg();
            let pattern = String::from_utf8(arg())
                .map_err(|_| ScriptError::InvalidRegex("pattern is not UTF-8".to_string()))?;
            let replacement = arg();

            let re = Regex::new(&pattern).map_err(|e| ScriptError::InvalidRegex(e.to_string()))?;
            Ok(re.replace_all(&input, replacement.as_slice()).into_owned())
        }
    }
}

/// `target = expr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    target: SlotName,
    expr: Expr,
}

impl Assignment {
    pub fn new(target: SlotName, expr: Expr) -> Self {
        Self { target, expr }
    }

    pub fn target(&self) -> SlotName {
        self.target
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl Mutator for Assignment {
    fn apply(
        &self,
        _slot: SlotName,
        current: Option<&Unit>,
        previous: Option<&Unit>,
    ) -> Result<Unit, MutationError> {
        let bytes = self.expr.eval(current, previous)?;
        Ok(Unit::from(bytes))
    }
}
