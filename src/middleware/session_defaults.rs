//! Default session data, laid under whatever the user has already answered.

use crate::request::Request;
use crate::store;
use crate::value::SessionData;

pub fn session_defaults(req: &mut Request, defaults: &SessionData) {
    if !defaults.is_empty() {
        store::apply_defaults(defaults, &mut req.session);
    }
}
