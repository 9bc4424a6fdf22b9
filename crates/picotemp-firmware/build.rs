//! Bakes the Wi-Fi credentials into the binary and sets up linking.
//!
//! Credentials come from the environment or a `.env` file next to this
//! crate, e.g.
//!
//! ```text
//! WIFI_SSID=my-network
//! WIFI_PASSWORD=correct horse battery staple
//! ```

const SECRETS: [&str; 2] = ["WIFI_SSID", "WIFI_PASSWORD"];

fn main() {
    println!("cargo:rerun-if-changed=.env");
    // A missing .env is fine as long as the variables are set some other way.
    let _ = dotenvy::dotenv();

    for key in SECRETS {
        println!("cargo:rerun-if-env-changed={key}");
        match std::env::var(key) {
            Ok(value) => println!("cargo:rustc-env={key}={value}"),
            Err(_) => panic!("{key} is not set; add it to .env or the environment"),
        }
    }

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
