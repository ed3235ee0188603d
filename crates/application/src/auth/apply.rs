//! Auth application
//!
//! Renders a resolved auth declaration into concrete headers or query
//! parameters. Parameter values are variable-resolved first, so tokens
//! like `{{access_token}}` work at every level of the hierarchy.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use uuid::Uuid;

use convoy_domain::{Auth, AuthType, HttpMethod, QueryParam, Url};

use crate::error::{AuthConfigError, PrepareError};
use crate::resolver::VariableResolver;

/// Renders `auth` onto the outgoing request parts.
///
/// `url` must already be variable-resolved; query-placed credentials
/// are appended to it, header-placed ones go into `headers`.
///
/// # Errors
///
/// [`AuthConfigError`] for missing or invalid parameters and
/// unsupported types; variable resolution failures propagate as
/// [`PrepareError::Variable`].
pub fn apply_auth(
    auth: &Auth,
    resolver: &VariableResolver<'_>,
    method: HttpMethod,
    url: &mut Url,
    headers: &mut Vec<(String, String)>,
) -> Result<(), PrepareError> {
    match auth.auth_type {
        AuthType::NoAuth => Ok(()),
        AuthType::Basic => apply_basic(auth, resolver, headers),
        AuthType::Bearer => apply_bearer(auth, resolver, headers),
        AuthType::ApiKey => apply_api_key(auth, resolver, url, headers),
        AuthType::OAuth2 => apply_oauth2(auth, resolver, url, headers),
        AuthType::OAuth1 => apply_oauth1(auth, resolver, method, url, headers),
        AuthType::Digest | AuthType::AwsV4 | AuthType::Ntlm | AuthType::Hawk => {
            Err(AuthConfigError::UnsupportedType(auth.auth_type).into())
        }
    }
}

fn resolved_param(
    auth: &Auth,
    resolver: &VariableResolver<'_>,
    param: &'static str,
) -> Result<Option<String>, PrepareError> {
    match auth.param(param) {
        Some(raw) => Ok(Some(resolver.resolve_value(raw)?)),
        None => Ok(None),
    }
}

fn required_param(
    auth: &Auth,
    resolver: &VariableResolver<'_>,
    param: &'static str,
) -> Result<String, PrepareError> {
    let value = resolved_param(auth, resolver, param)?;
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AuthConfigError::MissingParam {
            auth_type: auth.auth_type,
            param,
        }
        .into()),
    }
}

fn apply_basic(
    auth: &Auth,
    resolver: &VariableResolver<'_>,
    headers: &mut Vec<(String, String)>,
) -> Result<(), PrepareError> {
    // Empty credentials are legal for basic auth; only absence fails.
    let username = resolved_param(auth, resolver, "username")?.ok_or(
        AuthConfigError::MissingParam {
            auth_type: AuthType::Basic,
            param: "username",
        },
    )?;
    let password = resolved_param(auth, resolver, "password")?.ok_or(
        AuthConfigError::MissingParam {
            auth_type: AuthType::Basic,
            param: "password",
        },
    )?;

    let encoded = BASE64.encode(format!("{username}:{password}"));
    headers.push(("Authorization".to_string(), format!("Basic {encoded}")));
    Ok(())
}

fn apply_bearer(
    auth: &Auth,
    resolver: &VariableResolver<'_>,
    headers: &mut Vec<(String, String)>,
) -> Result<(), PrepareError> {
    let token = required_param(auth, resolver, "token")?;
    headers.push(("Authorization".to_string(), format!("Bearer {token}")));
    Ok(())
}

fn apply_api_key(
    auth: &Auth,
    resolver: &VariableResolver<'_>,
    url: &mut Url,
    headers: &mut Vec<(String, String)>,
) -> Result<(), PrepareError> {
    let key = required_param(auth, resolver, "key")?;
    let value = required_param(auth, resolver, "value")?;
    let location = resolved_param(auth, resolver, "in")?.unwrap_or_else(|| "header".to_string());

    match location.to_lowercase().as_str() {
        "header" => headers.push((key, value)),
        "query" => url.query.push(QueryParam::new(key, value)),
        other => {
            return Err(AuthConfigError::InvalidParam {
                auth_type: AuthType::ApiKey,
                param: "in",
                value: other.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn apply_oauth2(
    auth: &Auth,
    resolver: &VariableResolver<'_>,
    url: &mut Url,
    headers: &mut Vec<(String, String)>,
) -> Result<(), PrepareError> {
    let token = required_param(auth, resolver, "accessToken")?;
    let placement =
        resolved_param(auth, resolver, "addTokenTo")?.unwrap_or_else(|| "header".to_string());

    match placement.to_lowercase().as_str() {
        "header" => headers.push(("Authorization".to_string(), format!("Bearer {token}"))),
        "query" => url.query.push(QueryParam::new("access_token", token)),
        other => {
            return Err(AuthConfigError::InvalidParam {
                auth_type: AuthType::OAuth2,
                param: "addTokenTo",
                value: other.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn apply_oauth1(
    auth: &Auth,
    resolver: &VariableResolver<'_>,
    method: HttpMethod,
    url: &mut Url,
    headers: &mut Vec<(String, String)>,
) -> Result<(), PrepareError> {
    let consumer_key = required_param(auth, resolver, "consumerKey")?;
    let consumer_secret = required_param(auth, resolver, "consumerSecret")?;
    let token = required_param(auth, resolver, "token")?;
    let token_secret = required_param(auth, resolver, "tokenSecret")?;
    let signature_method = required_param(auth, resolver, "signatureMethod")?;

    let timestamp = Utc::now().timestamp().to_string();
    let nonce = Uuid::new_v4().simple().to_string();

    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), consumer_key),
        ("oauth_nonce".to_string(), nonce),
        (
            "oauth_signature_method".to_string(),
            signature_method.to_uppercase(),
        ),
        ("oauth_timestamp".to_string(), timestamp),
        ("oauth_token".to_string(), token),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    let signing_key = format!(
        "{}&{}",
        urlencoding::encode(&consumer_secret),
        urlencoding::encode(&token_secret)
    );

    let signature = match signature_method.to_uppercase().as_str() {
        "HMAC-SHA1" => {
            let base = signature_base_string(method, url, &oauth_params);
            let mut mac = Hmac::<Sha1>::new_from_slice(signing_key.as_bytes()).map_err(|e| {
                AuthConfigError::InvalidParam {
                    auth_type: AuthType::OAuth1,
                    param: "consumerSecret",
                    value: e.to_string(),
                }
            })?;
            mac.update(base.as_bytes());
            BASE64.encode(mac.finalize().into_bytes())
        }
        "PLAINTEXT" => signing_key,
        other => {
            return Err(AuthConfigError::UnsupportedSignatureMethod(other.to_string()).into());
        }
    };
    oauth_params.push(("oauth_signature".to_string(), signature));

    let header_value = format!(
        "OAuth {}",
        oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join(", ")
    );
    headers.push(("Authorization".to_string(), header_value));
    Ok(())
}

/// RFC 5849 §3.4.1: METHOD & enc(base-uri) & enc(sorted-params).
fn signature_base_string(method: HttpMethod, url: &Url, oauth_params: &[(String, String)]) -> String {
    let mut base_uri = String::new();
    if let Some(protocol) = &url.protocol {
        base_uri.push_str(&protocol.to_lowercase());
        base_uri.push_str("://");
    }
    base_uri.push_str(&url.host_string().to_lowercase());
    if let Some(port) = &url.port {
        let default = matches!(
            (url.protocol.as_deref(), port.as_str()),
            (Some("http"), "80") | (Some("https"), "443")
        );
        if !default {
            base_uri.push(':');
            base_uri.push_str(port);
        }
    }
    for segment in &url.path {
        base_uri.push('/');
        base_uri.push_str(segment);
    }

    let mut pairs: Vec<(String, String)> = url
        .query
        .iter()
        .filter(|p| !p.disabled)
        .map(|p| {
            (
                urlencoding::encode(&p.key).into_owned(),
                urlencoding::encode(&p.value).into_owned(),
            )
        })
        .chain(oauth_params.iter().map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        }))
        .collect();
    pairs.sort();

    let params = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.as_str(),
        urlencoding::encode(&base_uri),
        urlencoding::encode(&params)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ExecutionContext, Scope};
    use pretty_assertions::assert_eq;

    fn apply(auth: &Auth, ctx: &ExecutionContext) -> Result<(Url, Vec<(String, String)>), PrepareError> {
        let resolver = VariableResolver::new(ctx);
        let mut url = Url::from_raw("https://api.example.com/resource");
        let mut headers = Vec::new();
        apply_auth(auth, &resolver, HttpMethod::Get, &mut url, &mut headers)?;
        Ok((url, headers))
    }

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_basic_auth_encoding() {
        let ctx = ExecutionContext::new();
        let (_, headers) = apply(&Auth::basic("user", "pass"), &ctx).expect("applies");
        // "user:pass" in base64
        assert_eq!(header(&headers, "Authorization"), Some("Basic dXNlcjpwYXNz"));
    }

    #[test]
    fn test_basic_auth_missing_password() {
        let ctx = ExecutionContext::new();
        let auth = Auth::new(AuthType::Basic).with_param("username", "user");
        let err = apply(&auth, &ctx).expect_err("missing param");
        assert!(matches!(
            err,
            PrepareError::Auth(AuthConfigError::MissingParam { param: "password", .. })
        ));
    }

    #[test]
    fn test_bearer_with_variable_token() {
        let mut ctx = ExecutionContext::new();
        ctx.set(Scope::Environment, "token", "abc123");
        let (_, headers) = apply(&Auth::bearer("{{token}}"), &ctx).expect("applies");
        assert_eq!(header(&headers, "Authorization"), Some("Bearer abc123"));
    }

    #[test]
    fn test_bearer_empty_token_fails() {
        let ctx = ExecutionContext::new();
        let auth = Auth::new(AuthType::Bearer).with_param("token", "  ");
        assert!(apply(&auth, &ctx).is_err());
    }

    #[test]
    fn test_api_key_header_placement() {
        let ctx = ExecutionContext::new();
        let auth = Auth::api_key("X-Api-Key", "secret");
        let (url, headers) = apply(&auth, &ctx).expect("applies");
        assert_eq!(header(&headers, "X-Api-Key"), Some("secret"));
        assert!(url.query.is_empty());
    }

    #[test]
    fn test_api_key_query_placement() {
        let ctx = ExecutionContext::new();
        let auth = Auth::api_key("api_key", "secret").with_param("in", "query");
        let (url, headers) = apply(&auth, &ctx).expect("applies");
        assert!(headers.is_empty());
        assert_eq!(url.query[0].key, "api_key");
        assert_eq!(url.query[0].value, "secret");
    }

    #[test]
    fn test_api_key_invalid_location() {
        let ctx = ExecutionContext::new();
        let auth = Auth::api_key("k", "v").with_param("in", "body");
        let err = apply(&auth, &ctx).expect_err("invalid placement");
        assert!(matches!(
            err,
            PrepareError::Auth(AuthConfigError::InvalidParam { param: "in", .. })
        ));
    }

    #[test]
    fn test_oauth2_default_header() {
        let ctx = ExecutionContext::new();
        let auth = Auth::new(AuthType::OAuth2).with_param("accessToken", "tok");
        let (_, headers) = apply(&auth, &ctx).expect("applies");
        assert_eq!(header(&headers, "Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn test_oauth2_query_placement() {
        let ctx = ExecutionContext::new();
        let auth = Auth::new(AuthType::OAuth2)
            .with_param("accessToken", "tok")
            .with_param("addTokenTo", "query");
        let (url, headers) = apply(&auth, &ctx).expect("applies");
        assert!(headers.is_empty());
        assert_eq!(url.query[0].key, "access_token");
    }

    #[test]
    fn test_unsupported_types_reported() {
        let ctx = ExecutionContext::new();
        for auth_type in [AuthType::Digest, AuthType::AwsV4, AuthType::Ntlm, AuthType::Hawk] {
            let err = apply(&Auth::new(auth_type), &ctx).expect_err("unsupported");
            assert!(matches!(
                err,
                PrepareError::Auth(AuthConfigError::UnsupportedType(t)) if t == auth_type
            ));
        }
    }

    fn oauth1_auth() -> Auth {
        Auth::new(AuthType::OAuth1)
            .with_param("consumerKey", "ck")
            .with_param("consumerSecret", "cs")
            .with_param("token", "tk")
            .with_param("tokenSecret", "ts")
            .with_param("signatureMethod", "HMAC-SHA1")
    }

    #[test]
    fn test_oauth1_header_shape() {
        let ctx = ExecutionContext::new();
        let (_, headers) = apply(&oauth1_auth(), &ctx).expect("applies");
        let value = header(&headers, "Authorization").expect("header present");
        assert!(value.starts_with("OAuth "));
        for part in [
            "oauth_consumer_key=\"ck\"",
            "oauth_signature_method=\"HMAC-SHA1\"",
            "oauth_token=\"tk\"",
            "oauth_version=\"1.0\"",
            "oauth_signature=",
        ] {
            assert!(value.contains(part), "missing {part} in {value}");
        }
    }

    #[test]
    fn test_oauth1_unsupported_signature_method() {
        let ctx = ExecutionContext::new();
        let auth = oauth1_auth().with_param("signatureMethod", "RSA-SHA1");
        let err = apply(&auth, &ctx).expect_err("unsupported method");
        assert!(matches!(
            err,
            PrepareError::Auth(AuthConfigError::UnsupportedSignatureMethod(_))
        ));
    }

    #[test]
    fn test_oauth1_missing_param() {
        let ctx = ExecutionContext::new();
        let auth = Auth::new(AuthType::OAuth1).with_param("consumerKey", "ck");
        assert!(apply(&auth, &ctx).is_err());
    }

    #[test]
    fn test_signature_base_string_sorts_params() {
        let mut url = Url::from_raw("https://Example.com/req");
        url.query.push(QueryParam::new("z", "1"));
        url.query.push(QueryParam::new("a", "2"));
        let base = signature_base_string(
            HttpMethod::Post,
            &url,
            &[("oauth_nonce".to_string(), "n".to_string())],
        );
        assert!(base.starts_with("POST&https%3A%2F%2Fexample.com%2Freq&"));
        let params = base.split('&').nth(2).expect("params section");
        let a = params.find("a%3D2").expect("a present");
        let n = params.find("oauth_nonce").expect("nonce present");
        let z = params.find("z%3D1").expect("z present");
        assert!(a < n && n < z);
    }
}
