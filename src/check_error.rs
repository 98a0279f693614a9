use thiserror::Error;

/// Why an availability check could not produce a result.
///
/// The messages are shown verbatim to the chat that asked for the check.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Error: {detail}")]
    EmptyResponse { detail: &'static str },

    #[error("Error: no se encontró token CSRF")]
    TokenNotFound,

    #[error("Error: no se recibió cookie de sesión")]
    SessionCookieMissing,

    #[error("Error: no se pudo parsear respuesta JSONP")]
    JsonpParse,

    #[error("Error: contenido del widget vacío")]
    EmptyWidget,

    #[error("Error de red consultando citaconsular.es: {0}")]
    Transport(#[from] reqwest::Error),
}
