#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A name read before anything was assigned to it
    UndefinedIdentifier { name: String },
    /// A construct the target machine has no lowering for
    Unsupported {
        construct: String,
        hint: Option<String>,
    },
    /// `for i = ... next j`
    ForVariableMismatch { start: String, end: String },
    /// `break` or `continue` with no enclosing loop
    LoopControlOutsideLoop { keyword: String },
    UnknownFunction { name: String },
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    /// A second declaration, or a declaration reusing a built-in's name
    DuplicateFunction { name: String, builtin: bool },
    ReturnOutsideFunction,
    /// Internal compiler error (shouldn't happen in normal use)
    Internal(String),
}

impl CompileError {
    pub fn undefined(name: &str) -> Self {
        CompileError::UndefinedIdentifier {
            name: name.to_string(),
        }
    }

    pub fn unsupported(construct: &str, hint: impl Into<String>) -> Self {
        CompileError::Unsupported {
            construct: construct.to_string(),
            hint: Some(hint.into()),
        }
    }

    pub fn loop_control(keyword: &str) -> Self {
        CompileError::LoopControlOutsideLoop {
            keyword: keyword.to_string(),
        }
    }

    pub fn unknown_function(name: &str) -> Self {
        CompileError::UnknownFunction {
            name: name.to_string(),
        }
    }

    pub fn arity(name: &str, expected: usize, found: usize) -> Self {
        CompileError::ArityMismatch {
            name: name.to_string(),
            expected,
            found,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }

    fn hint(&self) -> Option<String> {
        match self {
            CompileError::UndefinedIdentifier { name } => {
                Some(format!("assign a value to '{}' before reading it", name))
            }
            CompileError::Unsupported { hint, .. } => hint.clone(),
            CompileError::ForVariableMismatch { start, .. } => {
                Some(format!("close the loop with 'next {}'", start))
            }
            CompileError::LoopControlOutsideLoop { .. } => {
                Some("only while, do...until and for loops can be left early".to_string())
            }
            CompileError::UnknownFunction { .. } => Some(
                "built-ins are print, input and assert; other names need a function declaration"
                    .to_string(),
            ),
            CompileError::DuplicateFunction { builtin: true, .. } => {
                Some("pick a different name for the function".to_string())
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "compile error: ")?;
        match self {
            CompileError::UndefinedIdentifier { name } => {
                write!(f, "undefined identifier '{}'", name)?
            }
            CompileError::Unsupported { construct, .. } => {
                write!(f, "'{}' is not supported", construct)?
            }
            CompileError::ForVariableMismatch { start, end } => write!(
                f,
                "for loop over '{}' is closed by 'next {}'",
                start, end
            )?,
            CompileError::LoopControlOutsideLoop { keyword } => {
                write!(f, "'{}' outside of a loop", keyword)?
            }
            CompileError::UnknownFunction { name } => write!(f, "unknown function '{}'", name)?,
            CompileError::ArityMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "'{}' takes {} argument{} but {} {} given",
                name,
                expected,
                if *expected == 1 { "" } else { "s" },
                found,
                if *found == 1 { "was" } else { "were" }
            )?,
            CompileError::DuplicateFunction { name, builtin } => {
                if *builtin {
                    write!(f, "'{}' is a built-in and cannot be redeclared", name)?
                } else {
                    write!(f, "function '{}' is declared more than once", name)?
                }
            }
            CompileError::ReturnOutsideFunction => write!(f, "'return' outside of a function")?,
            CompileError::Internal(msg) => write!(f, "internal error: {}", msg)?,
        }
        if let Some(h) = self.hint() {
            write!(f, "\n  hint: {}", h)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_identifier() {
        let err = CompileError::undefined("count");
        let msg = err.to_string();
        assert!(msg.starts_with("compile error:"));
        assert!(msg.contains("undefined identifier 'count'"));
        assert!(msg.contains("hint"));
    }

    #[test]
    fn test_unsupported_carries_hint() {
        let err = CompileError::unsupported("switch", "use if/elseif/else");
        let msg = err.to_string();
        assert!(msg.contains("'switch' is not supported"));
        assert!(msg.contains("hint: use if/elseif/else"));
    }

    #[test]
    fn test_for_mismatch_names_both_variables() {
        let err = CompileError::ForVariableMismatch {
            start: "i".to_string(),
            end: "j".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'i'"));
        assert!(msg.contains("next j"));
        assert!(msg.contains("next i"));
    }

    #[test]
    fn test_arity_grammar() {
        assert!(CompileError::arity("f", 1, 2)
            .to_string()
            .contains("takes 1 argument but 2 were given"));
        assert!(CompileError::arity("g", 2, 1)
            .to_string()
            .contains("takes 2 arguments but 1 was given"));
    }

    #[test]
    fn test_builtin_redeclaration() {
        let err = CompileError::DuplicateFunction {
            name: "print".to_string(),
            builtin: true,
        };
        assert!(err.to_string().contains("built-in"));
    }

    #[test]
    fn test_internal_error() {
        let err = CompileError::internal("unreachable label");
        assert_eq!(
            err.to_string(),
            "compile error: internal error: unreachable label"
        );
    }
}
