//! Confirmation reply classification.
//!
//! The mutation gate turns on this classifier, so it errs toward caution: a
//! reply containing any negative token is a refusal even when affirmative
//! words are also present, and anything unclear is ambiguous rather than
//! approval.

/// How a user reply to a staged proposal is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationReply {
    Affirmative,
    Negative,
    Ambiguous,
}

const AFFIRMATIVE_TOKENS: &[&str] = &[
    "yes", "y", "yeah", "yep", "confirm", "confirmed", "approve", "approved", "proceed", "apply",
    "ok", "okay", "sure", "go",
];

const NEGATIVE_TOKENS: &[&str] = &[
    "no", "n", "nope", "don't", "dont", "not", "stop", "cancel", "abort", "decline", "reject",
    "never", "wait",
];

/// Classify one user reply.
pub fn classify_reply(text: &str) -> ConfirmationReply {
    let tokens: Vec<String> = text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();

    if tokens.is_empty() {
        return ConfirmationReply::Ambiguous;
    }

    let negative = tokens.iter().any(|t| NEGATIVE_TOKENS.contains(&t.as_str()));
    if negative {
        return ConfirmationReply::Negative;
    }

    let affirmative = tokens.iter().any(|t| AFFIRMATIVE_TOKENS.contains(&t.as_str()));
    if affirmative {
        return ConfirmationReply::Affirmative;
    }

    ConfirmationReply::Ambiguous
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_approvals_are_affirmative() {
        for reply in ["yes", "y", "Yes, go ahead", "ok apply it", "confirmed", "sure, proceed"] {
            assert_eq!(classify_reply(reply), ConfirmationReply::Affirmative, "reply: {}", reply);
        }
    }

    #[test]
    fn refusals_are_negative() {
        for reply in ["no", "n", "No.", "don't do that", "stop", "cancel this", "abort"] {
            assert_eq!(classify_reply(reply), ConfirmationReply::Negative, "reply: {}", reply);
        }
    }

    #[test]
    fn negatives_win_over_affirmatives() {
        assert_eq!(classify_reply("yes but not yet"), ConfirmationReply::Negative);
        assert_eq!(classify_reply("ok wait"), ConfirmationReply::Negative);
    }

    #[test]
    fn unclear_replies_are_ambiguous() {
        for reply in ["what will this change?", "tell me more", "hmm", "", "   "] {
            assert_eq!(classify_reply(reply), ConfirmationReply::Ambiguous, "reply: {}", reply);
        }
    }
}
