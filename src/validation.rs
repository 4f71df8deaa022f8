use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

/// Brazilian phone numbers: optional +55, DDD, 8 or 9 digit subscriber
/// number, with common punctuation tolerated.
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?(?:55)?\s*\(?\d{2}\)?\s*9?\d{4}[\s.-]?\d{4}$").unwrap());

/// Validates a CPF (tax document) including its two check digits.
pub fn validate_cpf(cpf: &str) -> Result<(), ValidationError> {
    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != 11 {
        return Err(cpf_error("CPF must contain 11 digits"));
    }

    // 000.000.000-00 through 999.999.999-99 with repeated digits pass the
    // checksum but are not valid documents.
    if digits.windows(2).all(|w| w[0] == w[1]) {
        return Err(cpf_error("CPF digits must not all repeat"));
    }

    let check = |len: usize| -> u32 {
        let weight_start = len + 1;
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (weight_start - i) as u32)
            .sum();
        let rem = (sum * 10) % 11;
        if rem == 10 {
            0
        } else {
            rem
        }
    };

    if check(9) != digits[9] || check(10) != digits[10] {
        return Err(cpf_error("CPF check digits do not match"));
    }

    Ok(())
}

/// Validates a phone number format.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_RE.is_match(phone.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("invalid phone number format".into());
        Err(err)
    }
}

fn cpf_error(message: &'static str) -> ValidationError {
    let mut err = ValidationError::new("cpf");
    err.message = Some(message.into());
    err
}
