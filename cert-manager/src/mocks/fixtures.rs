use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::x509::{X509Name, X509};

use crate::acme::helpers::gen_rsa_private_key;
use crate::authority::CertificateBundle;

/// PEM encoded self-signed certificate for `domains`, plus its key.
pub fn self_signed_certificate(domains: &[String], valid_days: u32) -> (Vec<u8>, PKey<Private>) {
    let key = gen_rsa_private_key().unwrap();
    let mut name = X509Name::builder().unwrap();
    name.append_entry_by_text("CN", &domains[0]).unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(valid_days).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();

    (builder.build().to_pem().unwrap(), key)
}

pub fn issued_bundle(domains: &[String]) -> CertificateBundle {
    let (certificate, key) = self_signed_certificate(domains, 90);
    CertificateBundle {
        domains: domains.to_vec(),
        certificate,
        private_key: key.private_key_to_pem_pkcs8().unwrap(),
    }
}
