use axum::{
    Router,
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use server_comparison_core::params::AppEnvironment;
use tracing::debug;

const HELLO_WORLD: &str = "Hello World";

const NEGOTIATE_SCHEME: &str = "Negotiate";
const NTLM_SCHEME: &str = "NTLM";

/// Build the middleware chain for the named environment. One deterministic
/// chain per name; deployers select it purely through the environment
/// setting they pass down.
#[must_use]
pub fn site_router(environment: AppEnvironment) -> Router {
    match environment {
        AppEnvironment::HelloWorld => Router::new().fallback(hello_world),
        AppEnvironment::NtlmAuthentication => Router::new().fallback(ntlm_authentication),
    }
}

async fn hello_world() -> &'static str {
    HELLO_WORLD
}

/// Caller identity as presented on the request. The fixture treats any
/// `Authorization` header as a completed handshake and echoes its scheme;
/// actually negotiating Negotiate/NTLM is out of scope here.
fn presented_scheme(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let scheme = value.split_whitespace().next()?;
    (!scheme.is_empty()).then(|| scheme.to_owned())
}

fn challenge(schemes: &[&'static str]) -> Response {
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    for scheme in schemes {
        response
            .headers_mut()
            .append(header::WWW_AUTHENTICATE, HeaderValue::from_static(scheme));
    }
    response
}

const fn bool_label(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Path-keyed chain mirroring the authentication test site: anonymous
/// probes, challenge and forbid endpoints, and scheme-restricted paths.
async fn ntlm_authentication(request: Request) -> Response {
    let path = request.uri().path();
    let scheme = presented_scheme(request.headers());
    debug!(path, scheme = scheme.as_deref(), "serving request");

    match path {
        "/Anonymous" => format!("Anonymous?{}", bool_label(scheme.is_none())).into_response(),
        "/Restricted" => match scheme {
            Some(scheme) => scheme.into_response(),
            None => challenge(&[NEGOTIATE_SCHEME, NTLM_SCHEME]),
        },
        "/Forbidden" => StatusCode::FORBIDDEN.into_response(),
        "/AutoForbid" => challenge(&[NEGOTIATE_SCHEME, NTLM_SCHEME]),
        "/RestrictedNegotiate" => match scheme.as_deref() {
            Some(NEGOTIATE_SCHEME) => NEGOTIATE_SCHEME.into_response(),
            _ => challenge(&[NEGOTIATE_SCHEME]),
        },
        "/RestrictedNTLM" => match scheme.as_deref() {
            Some(NTLM_SCHEME) => NTLM_SCHEME.into_response(),
            _ => challenge(&[NTLM_SCHEME]),
        },
        _ => HELLO_WORLD.into_response(),
    }
}
