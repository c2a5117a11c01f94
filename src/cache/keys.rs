pub fn explanation_key(concept: &str, mastery: f64, confidence: f64) -> String {
    format!("explanation:{}:{}:{}", concept, mastery, confidence)
}

pub fn session_lock_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

pub fn user_lock_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explanation_key_distinguishes_inputs() {
        assert_ne!(
            explanation_key("closures", 0.5, 0.4),
            explanation_key("closures", 0.5, 0.41)
        );
        assert_eq!(
            explanation_key("closures", 0.5, 0.4),
            "explanation:closures:0.5:0.4"
        );
    }
}
