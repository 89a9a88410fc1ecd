//! Translates one decoded request `Packet` into a `Tree` mutation/query and
//! builds the reply `Packet`, per spec.md §4.4's action table.

use netfuse_protocol::{action, controller, EntryKind, Packet, RESULT_OK};
use tracing::debug;

use crate::tree::{Tree, TreeError};

fn ok() -> Packet {
    Packet::with_body(RESULT_OK)
}

fn err(message: impl Into<String>) -> Packet {
    Packet::with_body(message.into())
}

fn header_id(req: &Packet, key: &str) -> Result<u64, Packet> {
    req.header(key).and_then(|v| v.parse().ok()).ok_or_else(|| err(format!("missing or invalid `{key}`")))
}

fn header_str<'a>(req: &'a Packet, key: &str) -> Result<&'a str, Packet> {
    req.header(key).ok_or_else(|| err(format!("missing `{key}`")))
}

fn from_tree_result<T>(result: Result<T, TreeError>) -> Result<T, Packet> {
    result.map_err(|e| err(e.to_string()))
}

/// Handle one request against the shared tree, given the server's expected
/// (already-hashed) PSK. Returns the reply packet; never panics on
/// malformed input — every failure becomes a non-`"OK"` body per spec §4.4.
pub fn handle(req: &Packet, tree: &mut Tree, expected_psk: &str) -> Packet {
    let controller = req.header("controller").unwrap_or_default();
    let action = req.header("action").unwrap_or_default();
    debug!(controller, action, "handling request");

    match (controller, action) {
        (controller::AUTH, action::LOGIN) => handle_login(req, expected_psk),
        (controller::ECHO, action::ECHO) => Packet::with_body(req.body().clone()),
        (controller::DIR, action::LIST) => handle_dir_list(req, tree),
        (controller::DIR, action::ADD) => handle_dir_add(req, tree),
        (controller::DIR, action::RM) => handle_dir_rm(req, tree),
        (controller::DIR, action::MVDIR) => handle_mv(req, tree, EntryKind::Dir),
        (controller::FILE, action::PUT) => handle_file_put(req, tree),
        (controller::FILE, action::GET) => handle_file_get(req, tree),
        (controller::FILE, action::RM) => handle_file_rm(req, tree),
        (controller::FILE, action::MVFILE) => handle_mv(req, tree, EntryKind::File),
        _ => err(format!("unknown action {controller}#{action}")),
    }
}

fn handle_login(req: &Packet, expected_psk: &str) -> Packet {
    match req.header("psk") {
        Some(psk) if psk == expected_psk => ok(),
        _ => err("bad psk"),
    }
}

fn handle_dir_list(req: &Packet, tree: &Tree) -> Packet {
    let id = match req.header("id") {
        Some(raw) => match raw.parse() {
            Ok(id) => id,
            Err(_) => return err("invalid `id`"),
        },
        None => crate::tree::ROOT_ID,
    };
    match tree.listing(id) {
        Ok(listing) => match serde_json::to_vec(&listing) {
            Ok(body) => Packet::with_body(body),
            Err(e) => err(format!("failed to encode listing: {e}")),
        },
        Err(e) => err(e.to_string()),
    }
}

fn handle_dir_add(req: &Packet, tree: &mut Tree) -> Packet {
    let result = (|| {
        let parent = header_id(req, "id")?;
        let name = header_str(req, "name")?;
        from_tree_result(tree.add_dir(parent, name))
    })();
    match result {
        Ok(_) => ok(),
        Err(e) => e,
    }
}

fn handle_dir_rm(req: &Packet, tree: &mut Tree) -> Packet {
    let result = (|| {
        let id = header_id(req, "id")?;
        from_tree_result(tree.rm_dir(id))
    })();
    match result {
        Ok(()) => ok(),
        Err(e) => e,
    }
}

fn handle_file_put(req: &Packet, tree: &mut Tree) -> Packet {
    let result = (|| {
        let parent = header_id(req, "id")?;
        let name = header_str(req, "name")?;
        from_tree_result(tree.put_file(parent, name, req.body().clone()))
    })();
    match result {
        Ok(_) => ok(),
        Err(e) => e,
    }
}

fn handle_file_get(req: &Packet, tree: &Tree) -> Packet {
    let id = match header_id(req, "id") {
        Ok(id) => id,
        Err(e) => return e,
    };
    match tree.get_file(id) {
        Ok(content) => Packet::with_body(content).with_header("result", RESULT_OK),
        Err(e) => err(e.to_string()).with_header("result", "ERR"),
    }
}

fn handle_file_rm(req: &Packet, tree: &mut Tree) -> Packet {
    let result = (|| {
        let id = header_id(req, "id")?;
        from_tree_result(tree.rm_file(id))
    })();
    match result {
        Ok(()) => ok(),
        Err(e) => e,
    }
}

fn handle_mv(req: &Packet, tree: &mut Tree, kind: EntryKind) -> Packet {
    let result = (|| {
        let id = header_id(req, "id")?;
        let new_parent = header_id(req, "pdid")?;
        let new_name = header_str(req, "name")?;
        from_tree_result(tree.mv(id, new_parent, new_name, kind))
    })();
    match result {
        Ok(()) => ok(),
        Err(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netfuse_protocol::hash_psk;

    fn request(controller: &str, action: &str) -> Packet {
        Packet::new().with_header("controller", controller).with_header("action", action)
    }

    #[test]
    fn login_with_correct_psk_succeeds() {
        let mut tree = Tree::new();
        let expected = hash_psk("secret");
        let req = request(controller::AUTH, action::LOGIN).with_header("psk", expected.clone());
        let reply = handle(&req, &mut tree, &expected);
        assert_eq!(reply.body().as_ref(), RESULT_OK.as_bytes());
    }

    #[test]
    fn login_with_wrong_psk_is_rejected() {
        let mut tree = Tree::new();
        let expected = hash_psk("secret");
        let req = request(controller::AUTH, action::LOGIN).with_header("psk", "wrong");
        let reply = handle(&req, &mut tree, &expected);
        assert_ne!(reply.body().as_ref(), RESULT_OK.as_bytes());
    }

    #[test]
    fn echo_returns_the_same_body() {
        let mut tree = Tree::new();
        let req = Packet::with_body(netfuse_protocol::PING_BODY).with_header("controller", controller::ECHO).with_header(
            "action",
            action::ECHO,
        );
        let reply = handle(&req, &mut tree, "");
        assert_eq!(reply.body().as_ref(), netfuse_protocol::PING_BODY);
    }

    #[test]
    fn dir_list_with_no_id_lists_root() {
        let mut tree = Tree::new();
        let req = request(controller::DIR, action::LIST);
        let reply = handle(&req, &mut tree, "");
        let listing: netfuse_protocol::DirListing = serde_json::from_slice(reply.body()).unwrap();
        assert_eq!(listing["."].id, crate::tree::ROOT_ID);
    }

    #[test]
    fn file_put_then_file_get_round_trips() {
        let mut tree = Tree::new();
        let put = request(controller::FILE, action::PUT)
            .with_header("id", "1")
            .with_header("name", "a.txt");
        let mut put = put;
        put.set_body(bytes::Bytes::from_static(b"hi!"));
        let reply = handle(&put, &mut tree, "");
        assert_eq!(reply.body().as_ref(), RESULT_OK.as_bytes());

        let listing = tree.listing(crate::tree::ROOT_ID).unwrap();
        let id = listing["a.txt"].id;

        let get = request(controller::FILE, action::GET).with_header("id", id.to_string());
        let reply = handle(&get, &mut tree, "");
        assert_eq!(reply.header("result"), Some(RESULT_OK));
        assert_eq!(reply.body().as_ref(), b"hi!");
    }

    #[test]
    fn file_get_for_missing_id_reports_err_result() {
        let mut tree = Tree::new();
        let get = request(controller::FILE, action::GET).with_header("id", "999");
        let reply = handle(&get, &mut tree, "");
        assert_eq!(reply.header("result"), Some("ERR"));
    }
}
