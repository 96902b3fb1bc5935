//! Typed accessors for the values the login flow keeps in the session.
//!
//! Everything the flow reads or writes goes through here, so the session
//! only ever holds one representation of each value.

use crate::session::{AuthSession, OIDC_STATE_KEY, OIDC_VERIFIER_KEY, USER_ID_KEY};
use cadence_identity_core::{IdentityResult, UserId};
use serde_json::Value;

/// Largest integer an `f64` represents exactly.
const MAX_EXACT_FLOAT_INT: f64 = (1u64 << 53) as f64;

/// Ephemeral state of one pending login.
#[derive(Clone, PartialEq, Eq)]
pub struct FlowState {
    pub state: String,
    pub code_verifier: String,
}

impl std::fmt::Debug for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FlowState { .. }")
    }
}

/// Stores a pending flow, replacing any earlier unconsumed one.
pub async fn store_flow_state(session: &dyn AuthSession, flow: &FlowState) -> IdentityResult<()> {
    session
        .set(OIDC_STATE_KEY, Value::String(flow.state.clone()))
        .await?;
    session
        .set(OIDC_VERIFIER_KEY, Value::String(flow.code_verifier.clone()))
        .await?;
    session.save().await
}

/// Reads and removes the pending flow. When either key is present both are
/// deleted and the session saved, even if the pair is incomplete. A session
/// without flow keys is left untouched so that anonymous callbacks never
/// write a record.
pub async fn take_flow_state(session: &dyn AuthSession) -> IdentityResult<Option<FlowState>> {
    let state = session.get(OIDC_STATE_KEY).await?;
    let code_verifier = session.get(OIDC_VERIFIER_KEY).await?;

    if state.is_none() && code_verifier.is_none() {
        return Ok(None);
    }

    session.delete(OIDC_STATE_KEY).await?;
    session.delete(OIDC_VERIFIER_KEY).await?;
    session.save().await?;

    match (state, code_verifier) {
        (Some(Value::String(state)), Some(Value::String(code_verifier)))
            if !state.is_empty() && !code_verifier.is_empty() =>
        {
            Ok(Some(FlowState {
                state,
                code_verifier,
            }))
        }
        _ => Ok(None),
    }
}

pub async fn write_user_id(session: &dyn AuthSession, user_id: UserId) -> IdentityResult<()> {
    session.set(USER_ID_KEY, Value::from(user_id)).await
}

pub async fn read_user_id(session: &dyn AuthSession) -> IdentityResult<Option<UserId>> {
    Ok(session.get(USER_ID_KEY).await?.as_ref().and_then(user_id_from_value))
}

/// Accepts any JSON number that is exactly a non-negative integer, so that
/// `42` and `42.0` both read back as user 42.
pub fn user_id_from_value(value: &Value) -> Option<UserId> {
    let Value::Number(number) = value else {
        return None;
    };

    if let Some(id) = number.as_u64() {
        return Some(id);
    }

    let float = number.as_f64()?;
    if float.is_finite() && float >= 0.0 && float.fract() == 0.0 && float <= MAX_EXACT_FLOAT_INT {
        Some(float as UserId)
    } else {
        None
    }
}
