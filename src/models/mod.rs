pub mod request;

pub use request::{NewServiceRequest, RequestStatus, ServiceRequest};
