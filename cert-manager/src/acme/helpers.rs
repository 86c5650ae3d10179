use std::time::{Duration, SystemTime};

use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;

use crate::acme::error::*;

pub const ACCOUNT_KEY_BITS: u32 = 2048;

pub fn b64(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

pub fn gen_rsa_private_key() -> Result<PKey<Private>, AcmeError> {
    let rsa = Rsa::generate(ACCOUNT_KEY_BITS)?;
    let key = PKey::from_rsa(rsa)?;
    Ok(key)
}

pub(crate) fn asn1_time_to_system_time(time: &Asn1TimeRef) -> Result<SystemTime, AcmeError> {
    let unix_time = Asn1Time::from_unix(0)?.diff(time)?;
    Ok(SystemTime::UNIX_EPOCH
        + Duration::from_secs(unix_time.days as u64 * 86400 + unix_time.secs as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_b64_is_url_safe_without_padding() {
        assert_eq!(b64(&[0xfb, 0xff]), "-_8");
    }

    #[test]
    fn test_generated_key_is_rsa_2048() {
        let key = gen_rsa_private_key().unwrap();
        assert_eq!(key.rsa().unwrap().size() * 8, ACCOUNT_KEY_BITS);
    }

    #[test]
    fn test_asn1_time_conversion() {
        let time = Asn1Time::from_unix(86400 * 2 + 30).unwrap();
        let converted = asn1_time_to_system_time(&time).unwrap();
        assert_eq!(
            converted,
            SystemTime::UNIX_EPOCH + Duration::from_secs(86400 * 2 + 30)
        );
    }
}
