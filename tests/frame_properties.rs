//! Property tests for AT frame validation and construction.
//!
//! The submit frame embeds caller-supplied text between an address header and
//! a Ctrl+Z terminator, so the invariants worth hammering are: validation
//! accepts exactly the documented shapes, and no accepted input can produce
//! a frame with a stray terminator or split address line.

use proptest::prelude::*;
use sms_gateway::command::{validate_body, validate_number, AtCommand, CTRL_Z};
use std::time::Duration;

proptest! {
    #[test]
    fn plain_digit_numbers_accepted(digits in "[0-9]{3,15}") {
        prop_assert!(validate_number(&digits).is_ok());
    }

    #[test]
    fn international_prefix_accepted(digits in "[0-9]{3,15}") {
        let number = format!("+{digits}");
        prop_assert!(validate_number(&number).is_ok());
    }

    #[test]
    fn non_digit_characters_rejected(
        head in "[0-9]{0,5}",
        junk in "[^0-9+]{1,4}",
        tail in "[0-9]{0,5}",
    ) {
        let number = format!("{head}{junk}{tail}");
        prop_assert!(validate_number(&number).is_err());
    }

    #[test]
    fn overlong_numbers_rejected(digits in "[0-9]{16,32}") {
        prop_assert!(validate_number(&digits).is_err());
    }

    #[test]
    fn short_numbers_rejected(digits in "[0-9]{0,2}") {
        prop_assert!(validate_number(&digits).is_err());
    }

    #[test]
    fn printable_bodies_accepted(body in "[ !#-~]{1,160}") {
        prop_assert!(validate_body(&body).is_ok());
    }

    #[test]
    fn quoted_bodies_rejected(head in "[ !#-~]{0,40}", tail in "[ !#-~]{0,40}") {
        let body = format!("{head}\"{tail}");
        prop_assert!(validate_body(&body).is_err());
    }

    #[test]
    fn control_bytes_rejected_anywhere(
        prefix in "[ -~]{0,40}",
        ctrl in 0u8..0x20u8,
        suffix in "[ -~]{0,40}",
    ) {
        let body = format!("{prefix}{}{suffix}", ctrl as char);
        prop_assert!(validate_body(&body).is_err());
    }

    #[test]
    fn overlong_bodies_rejected(body in "[ -~]{161,200}") {
        prop_assert!(validate_body(&body).is_err());
    }

    #[test]
    fn submit_frame_singly_terminated(digits in "[0-9]{3,15}", body in "[ !#-~]{1,160}") {
        let command = AtCommand::submit(&digits, &body, Duration::ZERO)
            .expect("validated inputs always frame");
        let bytes = command.bytes();

        prop_assert!(bytes.starts_with(b"AT+CMGS=\""));
        prop_assert_eq!(bytes.last(), Some(&CTRL_Z));
        prop_assert_eq!(bytes.iter().filter(|&&b| b == CTRL_Z).count(), 1);
        // Exactly one carriage return: the one closing the address line.
        prop_assert_eq!(bytes.iter().filter(|&&b| b == b'\r').count(), 1);
        // And exactly two quotes: the address delimiters.
        prop_assert_eq!(bytes.iter().filter(|&&b| b == b'"').count(), 2);
    }
}
