//! CA key material and the X.509 issuance templates built from it
//! (`spec.md` §4.5). Grounded on `original_source/internal/common/cert-manager.go`'s
//! `NewX509UserCertificateTemplate` / `NewX509AgentCertificateTemplate`, built
//! with `openssl` the way `examples/other_examples/manifests/golemcloud-golem`
//! pairs `openssl`'s `x509`/`rsa`/`pkcs12` modules for equivalent CA-issuance
//! code.

use chrono::{DateTime, Duration, Utc};
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::extension::{BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName};
use openssl::x509::{X509Extension, X509NameBuilder, X509};

use crate::error::{CaError, CaResult};

pub const PKCS12_DEFAULT_PASSWORD: &str = "changeit";

#[derive(Debug, Clone, Default)]
pub struct SubjectFields {
    pub organization: String,
    pub country: String,
    pub province: String,
    pub locality: String,
    pub street: String,
    pub postal_code: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Validity {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl Validity {
    fn not_after(self, from: DateTime<Utc>) -> DateTime<Utc> {
        let total_months = self.years * 12 + self.months;
        let after_months = from
            .checked_add_months(chrono::Months::new(total_months))
            .unwrap_or(from);
        after_months + Duration::days(self.days as i64)
    }
}

#[derive(Copy, Clone)]
enum Eku {
    ClientAuth,
    ServerAuth,
}

pub struct IssuedCertificate {
    pub x509: X509,
    pub private_key: PKey<Private>,
    pub serial: i64,
    pub not_after: DateTime<Utc>,
}

/// CA certificate and private key loaded from disk at startup, plus the
/// configured OCSP responder list embedded into every issued certificate.
pub struct CaMaterial {
    ca_cert: X509,
    ca_cert_pem: Vec<u8>,
    ca_key: PKey<Private>,
    ocsp_responders: Vec<String>,
}

impl CaMaterial {
    pub fn load(ca_cert_pem: &[u8], ca_key_pem: &[u8], ocsp_responders: Vec<String>) -> CaResult<Self> {
        let ca_cert = X509::from_pem(ca_cert_pem)?;
        let ca_key = PKey::private_key_from_pem(ca_key_pem)?;
        Ok(Self {
            ca_cert,
            ca_cert_pem: ca_cert_pem.to_vec(),
            ca_key,
            ocsp_responders,
        })
    }

    pub fn ca_certificate(&self) -> &X509 {
        &self.ca_cert
    }

    /// The raw PEM bytes read from disk at startup — attached verbatim
    /// (zipped) when mailing a freshly issued user certificate.
    pub fn ca_certificate_pem(&self) -> &[u8] {
        &self.ca_cert_pem
    }

    /// CN = username, `ExtKeyUsage = ClientAuth`, no DNS names
    /// (`spec.md` §4.5).
    pub fn issue_user_certificate(
        &self,
        username: &str,
        subject: &SubjectFields,
        validity: Validity,
    ) -> CaResult<IssuedCertificate> {
        self.issue(username, subject, validity, None, Eku::ClientAuth)
    }

    /// CN = `"scnorion Agent Services"`, one lowercased DNS name,
    /// `ExtKeyUsage = ServerAuth`.
    pub fn issue_agent_certificate(
        &self,
        dns_name: &str,
        subject: &SubjectFields,
        validity: Validity,
    ) -> CaResult<IssuedCertificate> {
        self.issue(
            "scnorion Agent Services",
            subject,
            validity,
            Some(&dns_name.to_lowercase()),
            Eku::ServerAuth,
        )
    }

    fn issue(
        &self,
        common_name: &str,
        subject: &SubjectFields,
        validity: Validity,
        dns_name: Option<&str>,
        eku: Eku,
    ) -> CaResult<IssuedCertificate> {
        let rsa = Rsa::generate(4096)?;
        let private_key = PKey::from_rsa(rsa)?;

        let mut name_builder = X509NameBuilder::new()?;
        name_builder.append_entry_by_nid(Nid::COMMONNAME, common_name)?;
        append_if_present(&mut name_builder, Nid::ORGANIZATIONNAME, &subject.organization)?;
        append_if_present(&mut name_builder, Nid::COUNTRYNAME, &subject.country)?;
        append_if_present(&mut name_builder, Nid::STATEORPROVINCENAME, &subject.province)?;
        append_if_present(&mut name_builder, Nid::LOCALITYNAME, &subject.locality)?;
        append_if_present(&mut name_builder, Nid::STREETADDRESS, &subject.street)?;
        append_if_present(&mut name_builder, Nid::POSTALCODE, &subject.postal_code)?;
        let name = name_builder.build();

        let (serial_bn, serial) = random_serial()?;

        let now = Utc::now();
        let not_before = now - Duration::minutes(5);
        let not_after = validity.not_after(now);

        let mut builder = X509::builder()?;
        builder.set_version(2)?;
        builder.set_subject_name(&name)?;
        builder.set_issuer_name(self.ca_cert.subject_name())?;
        builder.set_pubkey(&private_key)?;
        builder.set_serial_number(&Asn1Integer::from_bn(&serial_bn)?)?;
        builder.set_not_before(&Asn1Time::from_unix(not_before.timestamp())?)?;
        builder.set_not_after(&Asn1Time::from_unix(not_after.timestamp())?)?;

        builder.append_extension(BasicConstraints::new().build()?)?;
        let mut key_usage = KeyUsage::new();
        key_usage.digital_signature();
        builder.append_extension(key_usage.build()?)?;

        let mut ext_key_usage = ExtendedKeyUsage::new();
        match eku {
            Eku::ClientAuth => {
                ext_key_usage.client_auth();
            }
            Eku::ServerAuth => {
                ext_key_usage.server_auth();
            }
        }
        builder.append_extension(ext_key_usage.build()?)?;

        if let Some(dns) = dns_name {
            let context = builder.x509v3_context(Some(&self.ca_cert), None);
            let san = SubjectAlternativeName::new().dns(dns).build(&context)?;
            builder.append_extension(san)?;
        }

        if !self.ocsp_responders.is_empty() {
            let value = self
                .ocsp_responders
                .iter()
                .map(|url| format!("OCSP;URI:{url}"))
                .collect::<Vec<_>>()
                .join(",");
            let context = builder.x509v3_context(Some(&self.ca_cert), None);
            let ext = X509Extension::new(None, Some(&context), "authorityInfoAccess", &value)?;
            builder.append_extension(ext)?;
        }

        builder.sign(&self.ca_key, MessageDigest::sha256())?;
        let x509 = builder.build();

        Ok(IssuedCertificate {
            x509,
            private_key,
            serial,
            not_after,
        })
    }

    /// Packages an issued user certificate plus CA chain into a PKCS#12
    /// blob. An empty `password` falls back to the PKCS#12 conventional
    /// default, matching `pkcs12.DefaultPassword` in the source system.
    pub fn package_pkcs12(&self, issued: &IssuedCertificate, username: &str, password: &str) -> CaResult<Vec<u8>> {
        let password = if password.is_empty() { PKCS12_DEFAULT_PASSWORD } else { password };

        let mut ca_chain = Stack::new()?;
        ca_chain.push(self.ca_cert.clone())?;

        let pkcs12 = Pkcs12::builder()
            .name(username)
            .pkey(&issued.private_key)
            .cert(&issued.x509)
            .ca(ca_chain)
            .build2(password)
            .map_err(|e| CaError::Packaging(e.to_string()))?;

        Ok(pkcs12.to_der()?)
    }
}

fn append_if_present(builder: &mut X509NameBuilder, nid: Nid, value: &str) -> CaResult<()> {
    if !value.is_empty() {
        builder.append_entry_by_nid(nid, value)?;
    }
    Ok(())
}

/// A positive 63-bit serial drawn from OpenSSL's own CSPRNG, fitting in an
/// `i64` the way the store's `serial BIGINT` column expects.
fn random_serial() -> CaResult<(BigNum, i64)> {
    let mut bn = BigNum::new()?;
    bn.rand(63, MsbOption::MAYBE_ZERO, false)?;
    let serial = bn
        .to_dec_str()?
        .parse::<i64>()
        .map_err(|e| CaError::Packaging(format!("serial out of range: {e}")))?;
    Ok((bn, serial))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn self_signed_ca() -> (Vec<u8>, Vec<u8>) {
        let rsa = Rsa::generate(2048).unwrap();
        let key = PKey::from_rsa(rsa).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, "test-ca").unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_serial_number(&Asn1Integer::from_bn(&BigNum::from_u32(1).unwrap()).unwrap())
            .unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(3650).unwrap())
            .unwrap();
        builder.append_extension(BasicConstraints::new().ca().build().unwrap()).unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();
        let cert = builder.build();

        (cert.to_pem().unwrap(), key.private_key_to_pem_pkcs8().unwrap())
    }

    #[test]
    fn agent_certificate_carries_lowercased_dns_and_ocsp_extension() {
        let (cert_pem, key_pem) = self_signed_ca();
        let material = CaMaterial::load(&cert_pem, &key_pem, vec!["http://ocsp.example.eu".into()]).unwrap();

        let issued = material
            .issue_agent_certificate(
                "A1.Example.EU",
                &SubjectFields::default(),
                Validity {
                    years: 1,
                    months: 0,
                    days: 0,
                },
            )
            .unwrap();

        assert!(issued.serial > 0);
        let now = Utc::now();
        assert!(now < issued.not_after);

        let san = issued
            .x509
            .subject_alt_names()
            .expect("san extension present");
        let dns = san.iter().next().unwrap().dnsname().unwrap();
        assert_eq!(dns, "a1.example.eu");
    }

    #[test]
    fn user_certificate_packages_into_pkcs12_with_matching_serial() {
        let (cert_pem, key_pem) = self_signed_ca();
        let material = CaMaterial::load(&cert_pem, &key_pem, vec![]).unwrap();

        let issued = material
            .issue_user_certificate(
                "alice",
                &SubjectFields::default(),
                Validity {
                    years: 1,
                    months: 0,
                    days: 0,
                },
            )
            .unwrap();

        let der = material.package_pkcs12(&issued, "alice", "").unwrap();
        let pkcs12 = Pkcs12::from_der(&der).unwrap();
        let parsed = pkcs12.parse2(PKCS12_DEFAULT_PASSWORD).unwrap();
        let decoded_cert = parsed.cert.unwrap();
        let decoded_serial = decoded_cert
            .serial_number()
            .to_bn()
            .unwrap()
            .to_dec_str()
            .unwrap()
            .parse::<i64>()
            .unwrap();
        assert_eq!(decoded_serial, issued.serial);
    }
}
