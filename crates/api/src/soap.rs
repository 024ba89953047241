//! Legacy SOAP binding.
//!
//! Exposes product creation only: `CreateProduct(name, about, price)`.
//! Missing or invalid arguments produce a SOAP 1.2 fault with code
//! `soap:Sender`, subcode `rpc:BadArguments` and HTTP 400.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::Money;
use domain::DomainError;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Serialize;
use store::{NewProduct, Product, Store};

use crate::AppState;

const CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";
const SOAP_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
const SOAP_RPC_NS: &str = "http://www.w3.org/2003/05/soap-rpc";

// -- Wire types --

#[derive(Serialize)]
#[serde(rename = "soap:Envelope")]
struct Envelope<T: Serialize> {
    #[serde(rename = "@xmlns:soap")]
    xmlns_soap: &'static str,
    #[serde(rename = "@xmlns:rpc")]
    xmlns_rpc: &'static str,
    #[serde(rename = "soap:Body")]
    body: T,
}

impl<T: Serialize> Envelope<T> {
    fn new(body: T) -> Self {
        Self {
            xmlns_soap: SOAP_ENVELOPE_NS,
            xmlns_rpc: SOAP_RPC_NS,
            body,
        }
    }
}

#[derive(Serialize)]
struct ResponseBody {
    #[serde(rename = "CreateProductResponse")]
    response: CreateProductResponse,
}

#[derive(Serialize)]
struct CreateProductResponse {
    id: i64,
    name: String,
    about: String,
    price: Money,
    average_score: f64,
}

impl From<Product> for CreateProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name,
            about: product.about,
            price: product.price,
            average_score: product.average_score,
        }
    }
}

#[derive(Serialize)]
struct FaultBody {
    #[serde(rename = "soap:Fault")]
    fault: Fault,
}

#[derive(Serialize)]
struct Fault {
    #[serde(rename = "soap:Code")]
    code: FaultCode,
    #[serde(rename = "soap:Reason")]
    reason: FaultReason,
}

#[derive(Serialize)]
struct FaultCode {
    #[serde(rename = "soap:Value")]
    value: &'static str,
    #[serde(rename = "soap:Subcode")]
    subcode: FaultSubcode,
}

#[derive(Serialize)]
struct FaultSubcode {
    #[serde(rename = "soap:Value")]
    value: &'static str,
}

#[derive(Serialize)]
struct FaultReason {
    #[serde(rename = "soap:Text")]
    text: &'static str,
}

fn xml_response<T: Serialize>(status: StatusCode, envelope: &Envelope<T>) -> Response {
    match quick_xml::se::to_string(envelope) {
        Ok(xml) => (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], xml).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize SOAP envelope");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn bad_arguments_fault() -> Response {
    let envelope = Envelope::new(FaultBody {
        fault: Fault {
            code: FaultCode {
                value: "soap:Sender",
                subcode: FaultSubcode {
                    value: "rpc:BadArguments",
                },
            },
            reason: FaultReason {
                text: "Processing Error",
            },
        },
    });
    xml_response(StatusCode::BAD_REQUEST, &envelope)
}

fn server_fault() -> Response {
    let envelope = Envelope::new(FaultBody {
        fault: Fault {
            code: FaultCode {
                value: "soap:Receiver",
                subcode: FaultSubcode {
                    value: "rpc:ServerError",
                },
            },
            reason: FaultReason {
                text: "Erreur serveur",
            },
        },
    });
    xml_response(StatusCode::INTERNAL_SERVER_ERROR, &envelope)
}

// -- Request parsing --

#[derive(Default)]
struct CreateProductArgs {
    name: Option<String>,
    about: Option<String>,
    price: Option<String>,
}

/// Pulls the `CreateProduct` arguments out of the request envelope.
///
/// Matching is by local element name so the client may use any namespace
/// prefixes.
fn parse_create_product(xml: &str) -> CreateProductArgs {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut args = CreateProductArgs::default();
    let mut current: Option<String> = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if matches!(local.as_str(), "name" | "about" | "price") {
                    current = Some(local);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(field) = current.take() {
                    let decoded = t.decode().unwrap_or_default();
                    let value = match quick_xml::escape::unescape(&decoded) {
                        Ok(v) => v.into_owned(),
                        Err(_) => decoded.into_owned(),
                    };
                    match field.as_str() {
                        "name" => args.name = Some(value),
                        "about" => args.about = Some(value),
                        "price" => args.price = Some(value),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    args
}

// -- Handler --

/// POST /soap/products — legacy `CreateProduct` operation.
#[tracing::instrument(skip(state, body))]
pub async fn create_product<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: String,
) -> Response {
    let args = parse_create_product(&body);
    let (Some(name), Some(about), Some(price)) = (args.name, args.about, args.price) else {
        return bad_arguments_fault();
    };
    let Ok(price) = price.trim().parse::<f64>() else {
        return bad_arguments_fault();
    };
    if !price.is_finite() {
        return bad_arguments_fault();
    }
    let price = Money::from_cents((price * 100.0).round() as i64);

    match state.products.create(NewProduct { name, about, price }).await {
        Ok(product) => {
            let envelope = Envelope::new(ResponseBody {
                response: product.into(),
            });
            xml_response(StatusCode::OK, &envelope)
        }
        Err(DomainError::Validation(_)) => bad_arguments_fault(),
        Err(err) => {
            tracing::error!(error = %err, "SOAP product creation failed");
            server_fault()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str = r#"<?xml version="1.0"?>
        <soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
          <soap:Body>
            <CreateProduct>
              <name>Clavier</name>
              <about>Un clavier m&#233;canique</about>
              <price>79.99</price>
            </CreateProduct>
          </soap:Body>
        </soap:Envelope>"#;

    #[test]
    fn parses_arguments_regardless_of_prefix() {
        let args = parse_create_product(REQUEST);
        assert_eq!(args.name.as_deref(), Some("Clavier"));
        assert_eq!(args.about.as_deref(), Some("Un clavier mécanique"));
        assert_eq!(args.price.as_deref(), Some("79.99"));

        let prefixed = REQUEST.replace("<name>", "<tns:name>").replace("</name>", "</tns:name>");
        let args = parse_create_product(&prefixed);
        assert_eq!(args.name.as_deref(), Some("Clavier"));
    }

    #[test]
    fn missing_fields_parse_as_none() {
        let args = parse_create_product("<Envelope><Body><CreateProduct><name>x</name></CreateProduct></Body></Envelope>");
        assert_eq!(args.name.as_deref(), Some("x"));
        assert!(args.about.is_none());
        assert!(args.price.is_none());
    }

    #[test]
    fn fault_envelope_carries_sender_code_and_subcode() {
        let envelope = Envelope::new(FaultBody {
            fault: Fault {
                code: FaultCode {
                    value: "soap:Sender",
                    subcode: FaultSubcode {
                        value: "rpc:BadArguments",
                    },
                },
                reason: FaultReason {
                    text: "Processing Error",
                },
            },
        });
        let xml = quick_xml::se::to_string(&envelope).unwrap();
        assert!(xml.contains("<soap:Value>soap:Sender</soap:Value>"));
        assert!(xml.contains("<soap:Value>rpc:BadArguments</soap:Value>"));
        assert!(xml.contains("<soap:Text>Processing Error</soap:Text>"));
    }
}
