use coinpilot::services::{
    address,
    command_router::{classify, holdings, parse_portfolio_lines, PortfolioLine, Route},
};

const WBNB: &str = "0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c";
const USDT_TRON: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

#[test]
fn evm_address_validation() {
    assert!(address::is_evm_address(WBNB));
    assert!(address::is_evm_address("0xBB4CDB9CBD36B01BD1CBAEBF2DE08D9173BC095C"));

    assert!(!address::is_evm_address("0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095"));
    assert!(!address::is_evm_address("0xbb4cdb9cbd36b01bd1cbaebf2de08d9173bc095cc"));
    assert!(!address::is_evm_address("bb4cdb9cbd36b01bd1cbaebf2de08d9173bc095c00"));
    assert!(!address::is_evm_address("0xzz4cdb9cbd36b01bd1cbaebf2de08d9173bc095c"));
    assert!(!address::is_evm_address(""));
}

#[test]
fn tron_address_validation() {
    assert!(address::is_tron_address(USDT_TRON));
    assert!(address::is_contract_address(USDT_TRON));

    // 0, O, I and l are not base58
    assert!(!address::is_tron_address("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj60"));
    assert!(!address::is_tron_address("XR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t"));
}

#[test]
fn short_and_normalize() {
    assert_eq!(address::short(WBNB), "0xbb4cdb9c...");
    assert_eq!(address::short("0x12"), "0x12");
    assert_eq!(address::normalize("0xBB4CDB9CBD36B01BD1CBAEBF2DE08D9173BC095C"), WBNB);
    assert_eq!(address::normalize(USDT_TRON), USDT_TRON);
}

#[test]
fn command_wins_and_strips_bot_suffix() {
    match classify("/GIA@coinpilot_bot btc") {
        Route::Command { name, args } => {
            assert_eq!(name, "gia");
            assert_eq!(args, "btc");
        }
        other => panic!("expected command, got {other:?}"),
    }

    match classify(&format!("/alert {WBNB} bsc 10")) {
        Route::Command { name, .. } => assert_eq!(name, "alert"),
        other => panic!("expected command, got {other:?}"),
    }
}

#[test]
fn single_address_is_a_lookup() {
    assert_eq!(classify(WBNB), Route::ContractAddress(WBNB.to_string()));
    assert_eq!(classify(&format!("  {USDT_TRON} ")), Route::ContractAddress(USDT_TRON.to_string()));
}

#[test]
fn portfolio_lines_parse_and_flag_without_aborting() {
    let text = format!(
        "100 {WBNB} bsc\nhello there\n2.5 0xnotanaddress eth\n1,000 {USDT_TRON} tron\nabc {WBNB} bsc"
    );
    let lines = parse_portfolio_lines(&text);

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], PortfolioLine::InvalidAddress { line: 3 });

    let hs = holdings(&lines);
    assert_eq!(hs.len(), 2);

    assert_eq!(hs[0].line, 1);
    assert_eq!(hs[0].amount, 100.0);
    assert_eq!(hs[0].address, WBNB);
    assert_eq!(hs[0].network, "bsc");

    assert_eq!(hs[1].line, 4);
    assert_eq!(hs[1].amount, 1000.0);
    assert_eq!(hs[1].amount_text, "1,000");
    assert_eq!(hs[1].network, "tron");
}

#[test]
fn portfolio_route_needs_one_valid_line() {
    assert!(matches!(classify(&format!("5 {WBNB} BSC")), Route::Portfolio(_)));
    assert_eq!(classify("5 0xnotanaddress bsc"), Route::FreeText);
}

#[test]
fn bracket_reminder_and_free_text() {
    assert_eq!(
        classify("<09:00 UTC+7 25/12/2030>:Claim token X"),
        Route::Reminder("<09:00 UTC+7 25/12/2030>:Claim token X".to_string())
    );
    assert_eq!(
        classify("<09:00 UTC+7 25/12/2099> : Claim token X"),
        Route::Reminder("<09:00 UTC+7 25/12/2099> : Claim token X".to_string())
    );
    assert_eq!(classify("gm everyone"), Route::FreeText);
}
