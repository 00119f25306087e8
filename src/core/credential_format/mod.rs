use core::fmt;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

const FORMAT_JWT_VC_JSON: &str = "jwt_vc_json";
const FORMAT_LDP_VC: &str = "ldp_vc";
const FORMAT_SD_JWT_VC: &str = "dc+sd-jwt";
const FORMAT_MSO_MDOC: &str = "mso_mdoc";

/// A Json object keyed by credential format.
pub type CredentialFormatMap = HashMap<CredentialFormat, serde_json::Value>;

/// The format a credential is issued in.
///
/// Covers the formats defined in OID4VCI Appendix A; issuers are free to use
/// other registered format identifiers, which are preserved verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CredentialFormat {
    /// W3C Verifiable Credential secured with JWT.
    JwtVcJson,
    /// W3C Verifiable Credential with Linked Data Proofs.
    LdpVc,
    /// IETF SD-JWT Verifiable Credential.
    SdJwtVc,
    /// ISO/IEC 18013-5 mobile document (mDL, etc.).
    MsoMdoc,
    /// Support for non-standard credential formats.
    Other(String),
}

impl From<String> for CredentialFormat {
    fn from(s: String) -> Self {
        match s.as_str() {
            FORMAT_JWT_VC_JSON => CredentialFormat::JwtVcJson,
            FORMAT_LDP_VC => CredentialFormat::LdpVc,
            FORMAT_SD_JWT_VC => CredentialFormat::SdJwtVc,
            FORMAT_MSO_MDOC => CredentialFormat::MsoMdoc,
            _ => CredentialFormat::Other(s),
        }
    }
}

impl From<&str> for CredentialFormat {
    fn from(s: &str) -> Self {
        s.to_owned().into()
    }
}

impl From<CredentialFormat> for String {
    fn from(format: CredentialFormat) -> Self {
        match format {
            CredentialFormat::JwtVcJson => FORMAT_JWT_VC_JSON.into(),
            CredentialFormat::LdpVc => FORMAT_LDP_VC.into(),
            CredentialFormat::SdJwtVc => FORMAT_SD_JWT_VC.into(),
            CredentialFormat::MsoMdoc => FORMAT_MSO_MDOC.into(),
            CredentialFormat::Other(f) => f,
        }
    }
}

impl fmt::Display for CredentialFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialFormat::JwtVcJson => FORMAT_JWT_VC_JSON,
            CredentialFormat::LdpVc => FORMAT_LDP_VC,
            CredentialFormat::SdJwtVc => FORMAT_SD_JWT_VC,
            CredentialFormat::MsoMdoc => FORMAT_MSO_MDOC,
            CredentialFormat::Other(f) => f,
        }
        .fmt(f)
    }
}
