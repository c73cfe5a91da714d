//! Trigger re-evaluation (spec §4.5.3 step 6, testable property #6). The
//! expression parser itself is out of scope (spec §1 Non-goals); this module
//! owns only the recovery-mode state machine and delegates actual expression
//! evaluation to an injected `TriggerEvaluator`, the same "collaborator
//! behind a trait" seam the teacher uses for its alert transport.

use crate::cc::model::{Id, Trigger, TriggerDiff, TriggerValueState};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum EvalResult {
    True,
    False,
    Unknown(String),
}

/// External collaborator: evaluates a trigger's expression against current
/// item state. Production wiring wraps whatever expression engine the
/// deployment brings; nothing in this crate parses trigger expressions.
#[async_trait]
pub trait TriggerEvaluator: Send + Sync {
    async fn eval_expression(&self, expression: &str) -> EvalResult;
}

#[derive(Debug, Clone)]
pub struct UnknownMessage {
    pub triggerid: Id,
    pub message: String,
}

/// Re-evaluate one trigger, applying the recovery-mode state machine (spec
/// testable property #6):
/// - `RecoveryMode::None`: the expression can only raise PROBLEM; once in
///   PROBLEM it stays there until cleared some other way, a false result
///   never recovers it.
/// - `RecoveryMode::Expression`: the same expression drives both
///   transitions — false recovers a PROBLEM back to OK.
/// - `RecoveryMode::RecoveryExpression`: a problem is cleared only by the
///   recovery expression evaluating true, never by the main expression
///   evaluating false.
/// An `Unknown` result never changes `value`; it only extends `error` so a
/// flapping expression cannot bounce the trigger between OK and PROBLEM on
/// noise. The event pipeline outside this module still observes a
/// `TriggerDiff` whenever `error` itself changed.
pub async fn reevaluate(
    trigger: &Trigger,
    evaluator: &dyn TriggerEvaluator,
    now: i64,
) -> (Option<TriggerDiff>, Option<UnknownMessage>) {
    let main_result = evaluator.eval_expression(&trigger.expression).await;

    let (new_value, new_error, unknown): (TriggerValueState, Arc<str>, Option<UnknownMessage>) =
        match main_result {
            EvalResult::Unknown(msg) => (
                trigger.value,
                Arc::from(msg.as_str()),
                Some(UnknownMessage {
                    triggerid: trigger.triggerid,
                    message: msg,
                }),
            ),
            EvalResult::True => (TriggerValueState::Problem, Arc::from(""), None),
            EvalResult::False => match trigger.recovery_mode {
                crate::cc::model::RecoveryMode::RecoveryExpression => {
                    if trigger.value != TriggerValueState::Problem {
                        (TriggerValueState::Ok, Arc::from(""), None)
                    } else {
                        let recovery_result =
                            evaluator.eval_expression(&trigger.recovery_expression).await;
                        match recovery_result {
                            EvalResult::True => (TriggerValueState::Ok, Arc::from(""), None),
                            EvalResult::False => (trigger.value, trigger.error.clone(), None),
                            EvalResult::Unknown(msg) => (
                                trigger.value,
                                Arc::from(msg.as_str()),
                                Some(UnknownMessage {
                                    triggerid: trigger.triggerid,
                                    message: msg,
                                }),
                            ),
                        }
                    }
                }
                crate::cc::model::RecoveryMode::Expression => (TriggerValueState::Ok, Arc::from(""), None),
                // Once in PROBLEM, a `none`-mode trigger only leaves it via a
                // manual/external clear, never by its own expression going
                // false again (spec §4.5.3 step 6, testable property #6).
                crate::cc::model::RecoveryMode::None => {
                    if trigger.value == TriggerValueState::Problem {
                        (trigger.value, trigger.error.clone(), None)
                    } else {
                        (TriggerValueState::Ok, Arc::from(""), None)
                    }
                }
            },
        };

    let value_changed = new_value != trigger.value;
    let error_changed = new_error != trigger.error;
    if !value_changed && !error_changed {
        return (None, unknown);
    }

    let diff = TriggerDiff {
        triggerid: trigger.triggerid,
        value: new_value,
        last_change: if value_changed { now } else { trigger.last_change },
        error: new_error,
    };
    (Some(diff), unknown)
}

#[cfg(test)]
pub struct ScriptedEvaluator {
    pub main: EvalResult,
    pub recovery: EvalResult,
}

#[cfg(test)]
#[async_trait]
impl TriggerEvaluator for ScriptedEvaluator {
    async fn eval_expression(&self, expression: &str) -> EvalResult {
        if expression.starts_with("recover:") {
            self.recovery.clone()
        } else {
            self.main.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cc::model::RecoveryMode;

    fn trigger(recovery_mode: RecoveryMode, value: TriggerValueState) -> Trigger {
        Trigger {
            triggerid: 1,
            expression: Arc::from("{1}=0"),
            recovery_mode,
            recovery_expression: Arc::from("recover:{1}=1"),
            correlation_mode: 0,
            correlation_tag: Arc::from(""),
            severity: 3,
            status: crate::cc::model::TriggerStatus::Enabled,
            value,
            last_change: 0,
            error: Arc::from(""),
        }
    }

    #[tokio::test]
    async fn none_mode_false_expression_leaves_problem_unrecovered() {
        let t = trigger(RecoveryMode::None, TriggerValueState::Problem);
        let ev = ScriptedEvaluator {
            main: EvalResult::False,
            recovery: EvalResult::False,
        };
        let (diff, _) = reevaluate(&t, &ev, 100).await;
        assert!(diff.is_none(), "none-mode trigger must stay PROBLEM once set");
    }

    #[tokio::test]
    async fn expression_mode_false_expression_clears_problem() {
        let t = trigger(RecoveryMode::Expression, TriggerValueState::Problem);
        let ev = ScriptedEvaluator {
            main: EvalResult::False,
            recovery: EvalResult::False,
        };
        let (diff, _) = reevaluate(&t, &ev, 100).await;
        assert_eq!(diff.unwrap().value, TriggerValueState::Ok);
    }

    #[tokio::test]
    async fn recovery_expression_mode_ignores_false_main_expression() {
        let t = trigger(RecoveryMode::RecoveryExpression, TriggerValueState::Problem);
        let ev = ScriptedEvaluator {
            main: EvalResult::False,
            recovery: EvalResult::False,
        };
        let (diff, _) = reevaluate(&t, &ev, 100).await;
        assert!(diff.is_none(), "problem must persist until recovery expression is true");
    }

    #[tokio::test]
    async fn recovery_expression_true_clears_problem() {
        let t = trigger(RecoveryMode::RecoveryExpression, TriggerValueState::Problem);
        let ev = ScriptedEvaluator {
            main: EvalResult::False,
            recovery: EvalResult::True,
        };
        let (diff, _) = reevaluate(&t, &ev, 100).await;
        assert_eq!(diff.unwrap().value, TriggerValueState::Ok);
    }

    #[tokio::test]
    async fn unknown_result_preserves_value_but_updates_error() {
        let t = trigger(RecoveryMode::None, TriggerValueState::Ok);
        let ev = ScriptedEvaluator {
            main: EvalResult::Unknown("no data".into()),
            recovery: EvalResult::False,
        };
        let (diff, unknown) = reevaluate(&t, &ev, 100).await;
        assert_eq!(diff.unwrap().value, TriggerValueState::Ok);
        assert!(unknown.is_some());
    }

    #[tokio::test]
    async fn no_change_yields_no_diff() {
        let t = trigger(RecoveryMode::None, TriggerValueState::Problem);
        let ev = ScriptedEvaluator {
            main: EvalResult::True,
            recovery: EvalResult::False,
        };
        let (diff, _) = reevaluate(&t, &ev, 100).await;
        assert!(diff.is_none());
    }
}
