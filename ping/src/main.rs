mod app;
mod icmp;
mod ip;
mod probe;
mod transport;

use app::PingApp;

fn main() {
    let app = PingApp::from_args();
    app.run();
}
