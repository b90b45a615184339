//! Application key encryption.
//!
//! The first call of a session must carry the application key encrypted with the
//! provider's RSA public key. Steps:
//!
//! 1. Base64 decode the public key published on the developer portal
//! 2. Parse it as an X.509 SubjectPublicKeyInfo and check that it is an RSA key
//! 3. Encrypt the application key with RSA PKCS#1 v1.5
//! 4. Base64 encode the ciphertext

use crate::errors::{MpesaError, Result};
use crate::types::Environment;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs8::{ObjectIdentifier, SubjectPublicKeyInfoRef};
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};

/// rsaEncryption (PKCS #1).
const RSA_ENCRYPTION_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Provider public key for the sandbox environment.
pub const SANDBOX_PUBLIC_KEY: &str = "MIICIjANBgkqhkiG9w0BAQEFAAOCAg8AMIICCgKCAgEArv9yxA69XQKBo24BaF/D+fvlqmGdYjqLQ5WtNBb5tquqGvAvG3WMFETVUSow/LizQalxj2ElMVrUmzu5mGGkxK08bWEXF7a1DEvtVJs6nppIlFJc2SnrU14AOrIrB28ogm58JjAl5BOQawOXD5dfSk7MaAA82pVHoIqEu0FxA8BOKU+RGTihRU+ptw1j4bsAJYiPbSX6i71gfPvwHPYamM0bfI4CmlsUUR3KvCG24rB6FNPcRBhM3jDuv8ae2kC33w9hEq8qNB55uw51vK7hyXoAa+U7IqP1y6nBdlN25gkxEA8yrsl1678cspeXr+3ciRyqoRgj9RD/ONbJhhxFvt1cLBh+qwK2eqISfBb06eRnNeC71oBokDm3zyCnkOtMDGl7IvnMfZfEPFCfg5QgJVk1msPpRvQxmEsrX9MQRyFVzgy2CWNIb7c+jPapyrNwoUbANlN8adU1m6yOuoX7F49x+OjiG2se0EJ6nafeKUXw/+hiJZvELUYgzKUtMAZVTNZfT8jjb58j8GVtuS+6TM2AutbejaCV84ZK58E2CRJqhmjQibEUO6KPdD7oTlEkFy52Y1uOOBXgYpqMzufNPmfdqqqSM4dU70PO8ogyKGiLAIxCetMjjm6FCMEA3Kc8K0Ig7/XtFm9By6VxTJK1Mg36TlHaZKP6VzVLXMtesJECAwEAAQ==";

/// Provider public key for the production environment.
pub const PRODUCTION_PUBLIC_KEY: &str = "MIICIjANBgkqhkiG9w0BAQEFAAOCAg8AMIICCgKCAgEAietPTdEyyoV/wvxRjS5pSn3ZBQH9hnVtQC9SFLgM9IkomEX9Vu9fBg2MzWSSqkQlaYIGFGH3d69Q5NOWkRo+Y8p5a61sc9hZ+ItAiEL9KIbZzhnMwi12jUYCTff0bVTsTGSNUePQ2V42sToOIKCeBpUtwWKhhW3CSpK7S1iJhS9H22/BT/pk21Jd8btwMLUHfVD95iXbHNM8u6vFaYuHczx966T7gpa9RGGXRtiOr3ScJq1515tzOSOsHTPHLTun59nxxJiEjKoI4Lb9h6IlauvcGAQHp5q6/2XmxuqZdGzh39uLac8tMSmY3vC3fiHYC3iMyTb7eXqATIhDUOf9mOSbgZMS19iiVZvz8igDl950IMcelJwcj0qCLoufLE5y8ud5WIw47OCVkD7tcAEPmVWlCQ744SIM5afw+Jg50T1SEtu3q3GiL0UQ6KTLDyDEt5BL9HWXAIXsjFdPDpX1jtxZavVQV+Jd7FXhuPQuDbh12liTROREdzatYWRnrhzeOJ5Se9xeXLvYSj8DmAI4iFf2cVtWCzj/02uK4+iIGXlX7lHP1W+tycLS7Pe2RdtC2+oz5RSSqb5jI4+3iEY/vZjSMBVk69pCDzZy4ZE8LBgyEvSabJ/cddwWmShcRS+21XvGQ1uXYLv0FCTEHHobCfmn2y8bJBb/Hct53BaojWUCAwEAAQ==";

/// Returns the embedded provider public key for an environment.
pub fn public_key(environment: Environment) -> &'static str {
    match environment {
        Environment::Sandbox => SANDBOX_PUBLIC_KEY,
        Environment::Production => PRODUCTION_PUBLIC_KEY,
    }
}

/// Decodes a Base64 X.509 public key and checks that it is an RSA key.
///
/// # Examples
///
/// ```
/// use mpesa_rs::crypto::{parse_public_key, SANDBOX_PUBLIC_KEY};
/// use rsa::traits::PublicKeyParts;
///
/// let key = parse_public_key(SANDBOX_PUBLIC_KEY).unwrap();
/// assert_eq!(key.size(), 512); // 4096-bit modulus
/// ```
pub fn parse_public_key(encoded: &str) -> Result<RsaPublicKey> {
    let der = BASE64.decode(encoded.trim().as_bytes())?;
    let spki = SubjectPublicKeyInfoRef::try_from(der.as_slice())?;

    if spki.algorithm.oid != RSA_ENCRYPTION_OID {
        return Err(MpesaError::NotRsaKey(spki.algorithm.oid.to_string()));
    }

    Ok(RsaPublicKey::try_from(spki)?)
}

/// Encrypts an application key with a Base64 X.509 RSA public key.
///
/// The ciphertext is randomised by the PKCS#1 v1.5 padding, so two calls with the
/// same inputs yield different outputs.
///
/// # Arguments
///
/// * `public_key` - Base64 encoded X.509 SubjectPublicKeyInfo
/// * `api_key` - Plain application key
///
/// # Examples
///
/// ```
/// use mpesa_rs::crypto::{encrypt_api_key, SANDBOX_PUBLIC_KEY};
///
/// let first = encrypt_api_key(SANDBOX_PUBLIC_KEY, "my-api-key").unwrap();
/// let second = encrypt_api_key(SANDBOX_PUBLIC_KEY, "my-api-key").unwrap();
/// assert_ne!(first, second);
/// ```
pub fn encrypt_api_key(public_key: &str, api_key: &str) -> Result<String> {
    let key = parse_public_key(public_key)?;
    let mut rng = rand::thread_rng();
    let ciphertext = key.encrypt(&mut rng, Pkcs1v15Encrypt, api_key.as_bytes())?;
    Ok(BASE64.encode(ciphertext))
}
