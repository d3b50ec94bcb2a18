use ddp_rs::connection::DDPConnection;
use rgb::RGB8;

/// Sends frames to a networked LED controller speaking DDP.
pub struct DdpWriter {
    connection: DDPConnection,
}

impl DdpWriter {
    pub fn new(connection: DDPConnection) -> Self {
        Self { connection }
    }

    pub fn connect(host: std::net::IpAddr, port: u16, udp_port: u16) -> Result<Self, crate::error::Error> {
        let socket = std::net::UdpSocket::bind(format!("0.0.0.0:{udp_port}"))
            .map_err(crate::error::Error::UDPBind)?;

        let connection = DDPConnection::try_new(
            format!("{host}:{port}"),
            ddp_rs::protocol::PixelConfig::default(), // RGB, 8 bits per channel
            ddp_rs::protocol::ID::Default,
            socket,
        )?;

        tracing::info!(%host, port, "Connected to DDP display");
        Ok(Self::new(connection))
    }
}

impl smart_leds_trait::SmartLedsWrite for DdpWriter {
    type Error = ddp_rs::error::DDPError;
    type Color = RGB8;

    fn write<T, I>(&mut self, iterator: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = I>,
        I: Into<Self::Color>,
    {
        let data = iterator
            .into_iter()
            .map(Into::into)
            .flat_map(|rgb: RGB8| [rgb.r, rgb.g, rgb.b])
            .collect::<Vec<u8>>();

        self.connection.write(&data).map(drop)
    }
}
