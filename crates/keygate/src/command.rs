//! Front-end command arguments and callback routing.
//!
//! Chat front-ends hand us raw argument lists and opaque callback tags.
//! Arguments are parsed here so every front-end applies the same rules, and
//! callback tags parse into the closed [`CallbackAction`] enum; a tag that
//! does not parse is rejected rather than looked up dynamically.

use std::fmt;
use std::str::FromStr;

use keygate_core::MAX_VALID_DAYS;
use thiserror::Error;

/// Validity used when an issuance command gives none, or gives garbage.
pub const DEFAULT_VALID_DAYS: u32 = 30;

/// Prefix of template-selection callback tags.
const TEMPLATE_TAG_PREFIX: &str = "template_";

/// Errors from parsing front-end input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The callback tag is not one we route.
    #[error("unknown callback action: {0:?}")]
    UnknownAction(String),
}

/// Validity in days from issuance-command arguments.
///
/// The first argument is used if it is all ASCII digits; anything else
/// falls back to `fallback`. The result is clamped to `1..=MAX_VALID_DAYS`.
pub fn parse_valid_days(args: &[&str], fallback: u32) -> u32 {
    let days = match args.first() {
        Some(arg) if !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit()) => {
            // All digits, so the only possible failure is overflow.
            arg.parse::<u32>().unwrap_or(MAX_VALID_DAYS)
        }
        _ => fallback,
    };
    days.clamp(1, MAX_VALID_DAYS)
}

/// The token from redemption-command arguments, trimmed and upper-cased.
///
/// `None` unless there is exactly one argument.
pub fn parse_redeem_token(args: &[&str]) -> Option<String> {
    match args {
        [token] => Some(normalize_token(token)),
        _ => None,
    }
}

/// Canonical form of a user-typed token.
pub fn normalize_token(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Document templates. Everything except [`Template::Basic`] needs an
/// active entitlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    Basic,
    Modern,
    Creative,
    Minimalist,
}

impl Template {
    /// All templates, in menu order.
    pub const ALL: [Template; 4] = [
        Template::Basic,
        Template::Modern,
        Template::Creative,
        Template::Minimalist,
    ];

    /// Tag suffix.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Template::Basic => "BASIC",
            Template::Modern => "MODERN",
            Template::Creative => "CREATIVE",
            Template::Minimalist => "MINIMALIST",
        }
    }

    /// Whether rendering with this template requires an entitlement.
    pub const fn requires_entitlement(&self) -> bool {
        !matches!(self, Template::Basic)
    }
}

impl FromStr for Template {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Template::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CommandError::UnknownAction(format!("{TEMPLATE_TAG_PREFIX}{s}")))
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a front-end button can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackAction {
    NewDocument,
    PremiumFeatures,
    ShowHelp,
    BackToMain,
    GetPremium,
    PrivacyPolicy,
    SelectTemplate(Template),
}

impl CallbackAction {
    /// The wire tag for this action.
    pub fn tag(&self) -> String {
        match self {
            CallbackAction::NewDocument => "new_resume".to_string(),
            CallbackAction::PremiumFeatures => "premium_features".to_string(),
            CallbackAction::ShowHelp => "show_help".to_string(),
            CallbackAction::BackToMain => "back_to_main".to_string(),
            CallbackAction::GetPremium => "get_premium".to_string(),
            CallbackAction::PrivacyPolicy => "privacy_policy".to_string(),
            CallbackAction::SelectTemplate(t) => format!("{TEMPLATE_TAG_PREFIX}{t}"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = CommandError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let action = match tag {
            "new_resume" => CallbackAction::NewDocument,
            "premium_features" => CallbackAction::PremiumFeatures,
            "show_help" => CallbackAction::ShowHelp,
            "back_to_main" => CallbackAction::BackToMain,
            "get_premium" => CallbackAction::GetPremium,
            "privacy_policy" => CallbackAction::PrivacyPolicy,
            _ => match tag.strip_prefix(TEMPLATE_TAG_PREFIX) {
                Some(name) => CallbackAction::SelectTemplate(name.parse()?),
                None => return Err(CommandError::UnknownAction(tag.to_string())),
            },
        };
        Ok(action)
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_days_default_and_clamp() {
        assert_eq!(parse_valid_days(&[], DEFAULT_VALID_DAYS), 30);
        assert_eq!(parse_valid_days(&["7"], DEFAULT_VALID_DAYS), 7);
        assert_eq!(parse_valid_days(&["400"], DEFAULT_VALID_DAYS), 365);
        assert_eq!(parse_valid_days(&["99999999999999"], DEFAULT_VALID_DAYS), 365);
        assert_eq!(parse_valid_days(&["0"], DEFAULT_VALID_DAYS), 1);
    }

    #[test]
    fn test_valid_days_non_numeric_falls_back() {
        assert_eq!(parse_valid_days(&["ten"], DEFAULT_VALID_DAYS), 30);
        assert_eq!(parse_valid_days(&["-5"], DEFAULT_VALID_DAYS), 30);
        assert_eq!(parse_valid_days(&["12d"], DEFAULT_VALID_DAYS), 30);
        assert_eq!(parse_valid_days(&[""], DEFAULT_VALID_DAYS), 30);
    }

    #[test]
    fn test_valid_days_fallback_is_clamped() {
        assert_eq!(parse_valid_days(&[], 7), 7);
        assert_eq!(parse_valid_days(&["x"], 900), 365);
        assert_eq!(parse_valid_days(&["14"], 7), 14);
    }

    #[test]
    fn test_redeem_token_needs_exactly_one_arg() {
        assert_eq!(parse_redeem_token(&[]), None);
        assert_eq!(parse_redeem_token(&["a", "b"]), None);
        assert_eq!(
            parse_redeem_token(&["  abcd-20270101-efgh \n"]),
            Some("ABCD-20270101-EFGH".to_string())
        );
    }

    #[test]
    fn test_callback_tags_parse() {
        assert_eq!(
            "premium_features".parse::<CallbackAction>(),
            Ok(CallbackAction::PremiumFeatures)
        );
        assert_eq!(
            "template_MODERN".parse::<CallbackAction>(),
            Ok(CallbackAction::SelectTemplate(Template::Modern))
        );
    }

    #[test]
    fn test_unknown_tags_rejected() {
        assert!("delete_everything".parse::<CallbackAction>().is_err());
        assert!("template_FANCY".parse::<CallbackAction>().is_err());
        assert!("template_".parse::<CallbackAction>().is_err());
        assert!("Show_Help".parse::<CallbackAction>().is_err());
    }

    #[test]
    fn test_tags_round_trip_for_every_action() {
        let mut actions = vec![
            CallbackAction::NewDocument,
            CallbackAction::PremiumFeatures,
            CallbackAction::ShowHelp,
            CallbackAction::BackToMain,
            CallbackAction::GetPremium,
            CallbackAction::PrivacyPolicy,
        ];
        actions.extend(Template::ALL.map(CallbackAction::SelectTemplate));

        for action in actions {
            assert_eq!(action.tag().parse::<CallbackAction>(), Ok(action));
        }
    }

    #[test]
    fn test_only_basic_is_free() {
        assert!(!Template::Basic.requires_entitlement());
        assert!(Template::Modern.requires_entitlement());
        assert!(Template::Minimalist.requires_entitlement());
    }
}
