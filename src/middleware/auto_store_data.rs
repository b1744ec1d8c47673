//! Stores every submitted answer in the session.
//!
//! Form fields first, then query fields, so `?name=x` beats a posted `name`.
//! The merged data is also published to templates as `data`.

use crate::request::Request;
use crate::store;
use crate::value::Value;

pub fn auto_store_data(req: &mut Request) {
    store::store_request_data(&req.form, &req.query, &mut req.session);
    sync_data_local(req);
}

/// Copies the current session data into the `data` local.
pub fn sync_data_local(req: &mut Request) {
    let data = Value::Mapping(req.session.clone());
    req.locals.insert("data", data);
}
