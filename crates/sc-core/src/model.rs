//! Canonical intermediate representation for proxy nodes.
//! 代理节点的规范中间表示。
//!
//! Every input dialect decodes into [`Node`]; every output dialect is
//! produced from it. The payload is a tagged union (one variant per
//! protocol) so that illegal states (Reality without TLS, a vmess node
//! without a UUID) are hard to construct by accident. Field naming
//! follows the sing-box vocabulary.

/// Stream framing used between client and server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Tcp,
    Ws,
    Grpc,
    /// HTTP/2 ("h2"/"http" in most dialects).
    H2,
    Quic,
    Kcp,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Ws => "ws",
            Self::Grpc => "grpc",
            Self::H2 => "h2",
            Self::Quic => "quic",
            Self::Kcp => "kcp",
        }
    }

    /// Parse a dialect's `type=`/`network` value, accepting known synonyms.
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "ws" | "websocket" => Self::Ws,
            "grpc" | "gun" => Self::Grpc,
            "h2" | "http" | "httpupgrade" => Self::H2,
            "quic" => Self::Quic,
            "kcp" | "mkcp" => Self::Kcp,
            _ => Self::Tcp,
        }
    }
}

/// Transport descriptor with kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transport {
    pub kind: TransportKind,
    /// ws/h2 path.
    pub path: Option<String>,
    /// ws/h2 Host header.
    pub host: Option<String>,
    /// gRPC service name.
    pub service_name: Option<String>,
    /// gRPC mode (`gun`/`multi`).
    pub mode: Option<String>,
}

/// REALITY parameters. Lives inside [`Tls`], so Reality structurally
/// implies TLS.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reality {
    pub public_key: String,
    pub short_id: Option<String>,
    pub spider_x: Option<String>,
}

/// TLS descriptor attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tls {
    pub enabled: bool,
    pub sni: Option<String>,
    pub alpn: Vec<String>,
    /// uTLS client-hello fingerprint (`fp=` in most dialects).
    pub fingerprint: Option<String>,
    pub insecure: bool,
    pub reality: Option<Reality>,
}

impl Tls {
    /// TLS that is switched on with everything else defaulted.
    pub fn on() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

/// Obfuscation sub-descriptor (shadowsocks simple-obfs, hysteria2
/// salamander, snell obfs).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Obfs {
    pub kind: String,
    pub host: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vmess {
    pub uuid: String,
    pub alter_id: u16,
    /// Encryption (`auto`, `aes-128-gcm`, `chacha20-poly1305`, `none`).
    pub security: String,
    pub transport: Transport,
    pub tls: Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vless {
    pub uuid: String,
    /// Flow control (`xtls-rprx-vision`).
    pub flow: Option<String>,
    pub transport: Transport,
    pub tls: Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Trojan {
    pub password: String,
    pub transport: Transport,
    pub tls: Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Shadowsocks {
    pub cipher: String,
    pub password: String,
    /// SIP003 plugin name (`obfs-local`, `v2ray-plugin`).
    pub plugin: Option<String>,
    /// Tokenized plugin options, insertion order preserved.
    pub plugin_opts: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShadowsocksR {
    pub cipher: String,
    pub password: String,
    pub protocol: String,
    pub protocol_param: Option<String>,
    pub obfs: String,
    pub obfs_param: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hysteria {
    pub auth: Option<String>,
    /// Wire protocol (`udp`, `wechat-video`, `faketcp`).
    pub protocol: Option<String>,
    pub up_mbps: Option<u32>,
    pub down_mbps: Option<u32>,
    pub obfs: Option<String>,
    pub tls: Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hysteria2 {
    pub password: String,
    pub obfs: Option<Obfs>,
    pub up_mbps: Option<u32>,
    pub down_mbps: Option<u32>,
    pub tls: Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tuic {
    pub uuid: String,
    pub password: String,
    pub congestion_control: Option<String>,
    pub udp_relay_mode: Option<String>,
    pub tls: Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WireGuard {
    pub private_key: String,
    pub public_key: String,
    pub preshared_key: Option<String>,
    /// Local interface addresses (CIDR or bare IP).
    pub address: Vec<String>,
    pub mtu: Option<u16>,
    /// Reserved bytes, comma separated as received.
    pub reserved: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnyTls {
    pub password: String,
    pub tls: Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snell {
    pub psk: String,
    pub version: u8,
    pub obfs: Option<Obfs>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Socks5 {
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Tls,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Http {
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Tls,
}

/// Protocol-specific payload, one variant per supported protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Vmess(Vmess),
    Vless(Vless),
    Trojan(Trojan),
    Shadowsocks(Shadowsocks),
    ShadowsocksR(ShadowsocksR),
    Hysteria(Hysteria),
    Hysteria2(Hysteria2),
    Tuic(Tuic),
    WireGuard(WireGuard),
    AnyTls(AnyTls),
    Snell(Snell),
    Socks5(Socks5),
    Http(Http),
}

/// One proxy endpoint in canonical form.
///
/// Immutable by convention: the pipeline clones and rewrites `name`
/// during rename, everything else is fixed at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Display label. Not unique, never part of the dedup identity.
    pub name: String,
    /// Hostname, IPv4 or IPv6 (no brackets).
    pub server: String,
    /// Always 1..=65535; parsers reject 0.
    pub port: u16,
    pub udp: bool,
    /// The original wire form, kept verbatim for anti-churn round-trips.
    pub raw_uri: Option<String>,
    pub payload: Payload,
}

impl Node {
    /// Canonical short protocol identifier (the one filter rules use).
    pub fn proto(&self) -> &'static str {
        match &self.payload {
            Payload::Vmess(_) => "vmess",
            Payload::Vless(_) => "vless",
            Payload::Trojan(_) => "trojan",
            Payload::Shadowsocks(_) => "ss",
            Payload::ShadowsocksR(_) => "ssr",
            Payload::Hysteria(_) => "hysteria",
            Payload::Hysteria2(_) => "hysteria2",
            Payload::Tuic(_) => "tuic",
            Payload::WireGuard(_) => "wireguard",
            Payload::AnyTls(_) => "anytls",
            Payload::Snell(_) => "snell",
            Payload::Socks5(_) => "socks5",
            Payload::Http(_) => "http",
        }
    }

    /// Primary credential for dedup identity: uuid, else password, else
    /// auth string, else private key.
    pub fn credential(&self) -> Option<&str> {
        match &self.payload {
            Payload::Vmess(p) => Some(&p.uuid),
            Payload::Vless(p) => Some(&p.uuid),
            Payload::Trojan(p) => Some(&p.password),
            Payload::Shadowsocks(p) => Some(&p.password),
            Payload::ShadowsocksR(p) => Some(&p.password),
            Payload::Hysteria(p) => p.auth.as_deref(),
            Payload::Hysteria2(p) => Some(&p.password),
            Payload::Tuic(p) => Some(&p.uuid),
            Payload::WireGuard(p) => Some(&p.private_key),
            Payload::AnyTls(p) => Some(&p.password),
            Payload::Snell(p) => Some(&p.psk),
            Payload::Socks5(p) => p.password.as_deref(),
            Payload::Http(p) => p.password.as_deref(),
        }
    }

    /// Transport descriptor for the stream-capable protocols.
    pub fn transport(&self) -> Option<&Transport> {
        match &self.payload {
            Payload::Vmess(p) => Some(&p.transport),
            Payload::Vless(p) => Some(&p.transport),
            Payload::Trojan(p) => Some(&p.transport),
            _ => None,
        }
    }

    /// TLS descriptor, for the protocols that carry one.
    pub fn tls(&self) -> Option<&Tls> {
        match &self.payload {
            Payload::Vmess(p) => Some(&p.tls),
            Payload::Vless(p) => Some(&p.tls),
            Payload::Trojan(p) => Some(&p.tls),
            Payload::Hysteria(p) => Some(&p.tls),
            Payload::Hysteria2(p) => Some(&p.tls),
            Payload::Tuic(p) => Some(&p.tls),
            Payload::AnyTls(p) => Some(&p.tls),
            Payload::Socks5(p) => Some(&p.tls),
            Payload::Http(p) => Some(&p.tls),
            _ => None,
        }
    }

    /// Default display label for links that carry no fragment.
    pub fn default_name(server: &str, port: u16) -> String {
        format!("{}:{}", server, port)
    }
}
