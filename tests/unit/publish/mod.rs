use super::*;

#[test]
fn gateway_url_has_exactly_one_slash() {
    assert_eq!(
        gateway_url("https://gateway.pinata.cloud/ipfs", "Qm123"),
        "https://gateway.pinata.cloud/ipfs/Qm123"
    );
    assert_eq!(
        gateway_url("https://gateway.pinata.cloud/ipfs/", "Qm123"),
        "https://gateway.pinata.cloud/ipfs/Qm123"
    );
    assert_eq!(gateway_url("http://gw//", "/bafy"), "http://gw/bafy");
}
