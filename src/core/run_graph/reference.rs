//! Decoding of `$(params.…)` and `$(tasks.…)` value expressions.

const PIPELINE_PARAM_PREFIX: &str = "$(params.";
const TASK_RESULT_PREFIX: &str = "$(tasks.";
const REFERENCE_SUFFIX: &str = ")";

/// Decoded form of a parameter value expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamRef {
    /// Plain value; the expression references nothing.
    Literal,
    /// Reference to a pipeline-level parameter.
    Pipeline { param: String },
    /// Reference to a result produced by an upstream task.
    TaskResult { task: String, result: String },
}

impl ParamRef {
    /// Upstream task name, when the expression references one.
    pub fn task(&self) -> Option<&str> {
        match self {
            ParamRef::TaskResult { task, .. } => Some(task),
            _ => None,
        }
    }

    /// Referenced parameter or result name.
    pub fn param(&self) -> Option<&str> {
        match self {
            ParamRef::Literal => None,
            ParamRef::Pipeline { param } => Some(param),
            ParamRef::TaskResult { result, .. } => Some(result),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, ParamRef::Literal)
    }
}

/// Decode a value expression. Unrecognized input decodes to [`ParamRef::Literal`].
pub fn decode(expr: &str) -> ParamRef {
    if let Some(name) = expr
        .strip_prefix(PIPELINE_PARAM_PREFIX)
        .and_then(|rest| rest.strip_suffix(REFERENCE_SUFFIX))
    {
        return ParamRef::Pipeline {
            param: name.to_string(),
        };
    }

    if expr.starts_with(TASK_RESULT_PREFIX) && expr.ends_with(REFERENCE_SUFFIX) {
        let segments: Vec<&str> = expr.split('.').collect();
        if segments.len() < 3 {
            return ParamRef::Literal;
        }
        let task = segments[1];
        let last = segments[segments.len() - 1];
        let result = last.strip_suffix(REFERENCE_SUFFIX).unwrap_or(last);
        if task.is_empty() || result.is_empty() {
            return ParamRef::Literal;
        }
        return ParamRef::TaskResult {
            task: task.to_string(),
            result: result.to_string(),
        };
    }

    ParamRef::Literal
}
