use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use quick_xml::escape::escape;
use sha1::{Digest, Sha1};

pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
const TOKEN_PROFILE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0";
const BASE64_BINARY: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

/// Lifetime of a `wsu:Timestamp` when one is emitted.
const TIMESTAMP_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordType {
    PasswordText,
    PasswordDigest,
}

impl PasswordType {
    fn type_uri(self) -> String {
        match self {
            PasswordType::PasswordText => format!("{}#PasswordText", TOKEN_PROFILE),
            PasswordType::PasswordDigest => format!("{}#PasswordDigest", TOKEN_PROFILE),
        }
    }
}

/// Which optional parts of a WS-Security username token are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WsSecurityOptions {
    pub has_nonce: bool,
    pub has_timestamp: bool,
    pub has_token_created: bool,
    pub must_understand: bool,
    pub password_type: PasswordType,
}

/// Username-token settings used for every tracking call.
pub const TRACKING_WS_SECURITY: WsSecurityOptions = WsSecurityOptions {
    has_nonce: true,
    has_timestamp: false,
    has_token_created: true,
    must_understand: true,
    password_type: PasswordType::PasswordDigest,
};

/// Per-call authentication attached to a SOAP invocation.
#[derive(Clone, PartialEq)]
pub enum Security {
    /// HTTP basic credentials on the transport request.
    Basic { login: String, pass: String },
    /// A `wsse:Security` username token in the SOAP header.
    WsSecurity {
        login: String,
        pass: String,
        options: WsSecurityOptions,
    },
}

impl Security {
    pub fn basic(login: impl Into<String>, pass: impl Into<String>) -> Self {
        Security::Basic {
            login: login.into(),
            pass: pass.into(),
        }
    }

    pub fn ws_security(
        login: impl Into<String>,
        pass: impl Into<String>,
        options: WsSecurityOptions,
    ) -> Self {
        Security::WsSecurity {
            login: login.into(),
            pass: pass.into(),
            options,
        }
    }

    pub fn login(&self) -> &str {
        match self {
            Security::Basic { login, .. } | Security::WsSecurity { login, .. } => login,
        }
    }

    /// Adds transport-level credentials to the outgoing request.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Security::Basic { login, pass } => request.basic_auth(login, Some(pass)),
            Security::WsSecurity { .. } => request,
        }
    }

    /// Renders the SOAP header block for this call, if the scheme has one.
    ///
    /// `envelope_prefix` is the namespace prefix bound to the SOAP envelope
    /// namespace, used for `mustUnderstand`.
    pub fn soap_header(&self, envelope_prefix: &str) -> Option<String> {
        match self {
            Security::Basic { .. } => None,
            Security::WsSecurity {
                login,
                pass,
                options,
            } => Some(render_username_token(
                login,
                pass,
                options,
                envelope_prefix,
                Utc::now(),
                rand::random::<[u8; 16]>(),
            )),
        }
    }
}

impl std::fmt::Debug for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Security::Basic { login, .. } => f
                .debug_struct("Basic")
                .field("login", login)
                .field("pass", &"<redacted>")
                .finish(),
            Security::WsSecurity { login, options, .. } => f
                .debug_struct("WsSecurity")
                .field("login", login)
                .field("pass", &"<redacted>")
                .field("options", options)
                .finish(),
        }
    }
}

/// `Base64(SHA-1(nonce + created + password))`, per the username token profile.
pub fn password_digest(nonce: Option<&[u8]>, created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    if let Some(nonce) = nonce {
        hasher.update(nonce);
    }
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    general_purpose::STANDARD.encode(hasher.finalize())
}

/// Renders a complete `wsse:Security` header element.
pub fn render_username_token(
    login: &str,
    pass: &str,
    options: &WsSecurityOptions,
    envelope_prefix: &str,
    now: DateTime<Utc>,
    nonce: [u8; 16],
) -> String {
    let created = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let nonce = options.has_nonce.then_some(&nonce[..]);

    let mut xml = format!(
        "<wsse:Security xmlns:wsse=\"{}\" xmlns:wsu=\"{}\"",
        WSSE_NS, WSU_NS
    );
    if options.must_understand {
        xml.push_str(&format!(" {}:mustUnderstand=\"1\"", envelope_prefix));
    }
    xml.push('>');

    if options.has_timestamp {
        let expires = (now + Duration::minutes(TIMESTAMP_TTL_MINUTES))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        xml.push_str(&format!(
            "<wsu:Timestamp wsu:Id=\"Timestamp-{created}\"><wsu:Created>{created}</wsu:Created><wsu:Expires>{expires}</wsu:Expires></wsu:Timestamp>"
        ));
    }

    let password = match options.password_type {
        PasswordType::PasswordText => escape(pass).into_owned(),
        PasswordType::PasswordDigest => password_digest(nonce, &created, pass),
    };

    xml.push_str(&format!(
        "<wsse:UsernameToken wsu:Id=\"SecurityToken-{created}\"><wsse:Username>{}</wsse:Username><wsse:Password Type=\"{}\">{}</wsse:Password>",
        escape(login),
        options.password_type.type_uri(),
        password
    ));
    if let Some(nonce) = nonce {
        xml.push_str(&format!(
            "<wsse:Nonce EncodingType=\"{}\">{}</wsse:Nonce>",
            BASE64_BINARY,
            general_purpose::STANDARD.encode(nonce)
        ));
    }
    if options.has_token_created {
        xml.push_str(&format!("<wsu:Created>{created}</wsu:Created>"));
    }
    xml.push_str("</wsse:UsernameToken></wsse:Security>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 0).unwrap()
    }

    #[test]
    fn tracking_options_are_fixed() {
        assert!(TRACKING_WS_SECURITY.has_nonce);
        assert!(!TRACKING_WS_SECURITY.has_timestamp);
        assert!(TRACKING_WS_SECURITY.has_token_created);
        assert!(TRACKING_WS_SECURITY.must_understand);
        assert_eq!(
            TRACKING_WS_SECURITY.password_type,
            PasswordType::PasswordDigest
        );
    }

    #[test]
    fn tracking_header_has_nonce_and_created_but_no_timestamp() {
        let xml = render_username_token(
            "user",
            "pass",
            &TRACKING_WS_SECURITY,
            "soap",
            fixed_time(),
            [7u8; 16],
        );

        assert!(xml.starts_with("<wsse:Security"));
        assert!(xml.contains("soap:mustUnderstand=\"1\""));
        assert!(xml.contains("<wsse:Username>user</wsse:Username>"));
        assert!(xml.contains("#PasswordDigest\""));
        assert!(xml.contains(&format!(
            "<wsse:Nonce EncodingType=\"{}\">{}</wsse:Nonce>",
            BASE64_BINARY,
            general_purpose::STANDARD.encode([7u8; 16])
        )));
        assert!(xml.contains("<wsu:Created>2024-05-17T12:30:00Z</wsu:Created>"));
        assert!(!xml.contains("wsu:Timestamp"));
        // the plain password never appears in a digest token
        assert!(!xml.contains(">pass<"));
    }

    #[test]
    fn digest_covers_nonce_created_and_password() {
        let created = "2024-05-17T12:30:00Z";
        let with_nonce = password_digest(Some(&[1u8; 16]), created, "pass");
        let other_nonce = password_digest(Some(&[2u8; 16]), created, "pass");
        let other_time = password_digest(Some(&[1u8; 16]), "2024-05-17T12:31:00Z", "pass");
        let other_pass = password_digest(Some(&[1u8; 16]), created, "other");

        assert_ne!(with_nonce, other_nonce);
        assert_ne!(with_nonce, other_time);
        assert_ne!(with_nonce, other_pass);
        // SHA-1 digests are 20 bytes, 28 characters in base64
        assert_eq!(with_nonce.len(), 28);

        let xml = render_username_token(
            "user",
            "pass",
            &TRACKING_WS_SECURITY,
            "soap",
            fixed_time(),
            [1u8; 16],
        );
        assert!(xml.contains(&format!(">{}</wsse:Password>", with_nonce)));
    }

    #[test]
    fn text_password_with_timestamp() {
        let options = WsSecurityOptions {
            has_nonce: false,
            has_timestamp: true,
            has_token_created: false,
            must_understand: false,
            password_type: PasswordType::PasswordText,
        };
        let xml = render_username_token("u<1>", "p&ss", &options, "soap", fixed_time(), [0; 16]);

        assert!(xml.contains("<wsse:Username>u&lt;1&gt;</wsse:Username>"));
        assert!(xml.contains("#PasswordText\">p&amp;ss</wsse:Password>"));
        assert!(xml.contains("<wsu:Expires>2024-05-17T12:40:00Z</wsu:Expires>"));
        assert!(!xml.contains("mustUnderstand"));
        assert!(!xml.contains("wsse:Nonce"));
        assert!(!xml.contains("<wsu:Created>2024-05-17T12:30:00Z</wsu:Created></wsse:UsernameToken>"));
    }

    #[test]
    fn basic_security_has_no_soap_header() {
        let security = Security::basic("user", "pass");
        assert!(security.soap_header("soap").is_none());
        assert_eq!(security.login(), "user");
    }

    #[test]
    fn fresh_nonce_per_header() {
        let security = Security::ws_security("user", "pass", TRACKING_WS_SECURITY);
        let first = security.soap_header("soap").unwrap();
        let second = security.soap_header("soap").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn debug_output_hides_password() {
        let security = Security::ws_security("user", "hunter2", TRACKING_WS_SECURITY);
        assert!(!format!("{:?}", security).contains("hunter2"));
    }

    #[test]
    fn nonce_bytes_are_fully_random() {
        let security = Security::ws_security("user", "pass", TRACKING_WS_SECURITY);
        let nonces: Vec<Vec<u8>> = (0..64)
            .map(|_| {
                let xml = security.soap_header("soap").unwrap();
                let start = xml.find("Base64Binary\">").unwrap() + "Base64Binary\">".len();
                let end = xml.find("</wsse:Nonce>").unwrap();
                general_purpose::STANDARD.decode(&xml[start..end]).unwrap()
            })
            .collect();

        assert!(nonces.iter().all(|nonce| nonce.len() == 16));
        // a v4 UUID would pin the high nibble of byte 6 to 4
        assert!(nonces.iter().any(|nonce| nonce[6] >> 4 != 4));
    }
}
