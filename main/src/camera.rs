use crate::device;
use crate::device::DeviceInformation;
use crate::device::VideoEncoderOptions;
use crate::soap;
use crate::soap::Credentials;
use crate::soap::SoapError;
use crate::transport::HttpSoapClient;
use crate::transport::SoapClient;
use thiserror::Error;

/// Construction is the only operation with a dedicated error kind. The
/// underlying causes — unreachable host, rejected credentials, a device
/// without ONVIF — are deliberately not distinguished; retry the whole
/// construction.
#[derive(Error, Debug)]
#[error("Could not connect to camera. Verify credentials and ONVIF support.")]
pub struct CameraError(#[from] SoapError);

/// A read-only handle onto one ONVIF camera.
///
/// Holds no device state beyond the session endpoints and the first media
/// profile token; every accessor is a fresh remote round trip.
pub struct Camera {
    device_url: String,
    media_url: String,
    profile_token: String,
    credentials: Credentials,
    client: Box<dyn SoapClient + Send + Sync>,
}

impl Camera {
    /// Opens a session with the device at `address` and retrieves its first
    /// media profile.
    pub async fn connect(
        address: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, CameraError> {
        Self::connect_internal(address, username, password, Box::new(HttpSoapClient::default()))
            .await
    }

    async fn connect_internal(
        address: &str,
        username: &str,
        password: &str,
        client: Box<dyn SoapClient + Send + Sync>,
    ) -> Result<Self, CameraError> {
        let device_url = format!("http://{}/onvif/device_service", address);
        let credentials = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = client
            .call(
                device_url.clone(),
                soap::build_envelope(&credentials, device::GET_CAPABILITIES),
            )
            .await?;
        let capabilities = device::parse_capabilities(&response)?;
        let media_url = capabilities
            .media_xaddr
            .ok_or(SoapError::MissingElement("Media"))?;

        let response = client
            .call(
                media_url.clone(),
                soap::build_envelope(&credentials, device::GET_PROFILES),
            )
            .await?;
        let profile_token = device::parse_first_profile_token(&response)?;
        log::debug!("Connected to {} with media profile {}", address, profile_token);

        Ok(Self {
            device_url,
            media_url,
            profile_token,
            credentials,
            client,
        })
    }

    pub async fn hostname(&self) -> Result<String, SoapError> {
        let response = self.device_call(device::GET_HOSTNAME).await?;
        device::parse_hostname(&response)
    }

    pub async fn manufacturer(&self) -> Result<String, SoapError> {
        Ok(self.device_information().await?.manufacturer)
    }

    pub async fn model(&self) -> Result<String, SoapError> {
        Ok(self.device_information().await?.model)
    }

    pub async fn firmware_version(&self) -> Result<String, SoapError> {
        Ok(self.device_information().await?.firmware_version)
    }

    /// The device serial number, which cameras commonly populate with their
    /// MAC address.
    pub async fn mac_address(&self) -> Result<String, SoapError> {
        Ok(self.device_information().await?.serial_number)
    }

    pub async fn hardware_id(&self) -> Result<String, SoapError> {
        Ok(self.device_information().await?.hardware_id)
    }

    /// Resolutions the first media profile offers for H.264, as
    /// `(width, height)` pairs.
    pub async fn resolutions_available(&self) -> Result<Vec<(u32, u32)>, SoapError> {
        Ok(self.video_encoder_options().await?.resolutions)
    }

    /// Minimum and maximum supported H.264 frame rate.
    pub async fn frame_rate_range(&self) -> Result<(u32, u32), SoapError> {
        let options = self.video_encoder_options().await?;
        Ok((options.frame_rate_min, options.frame_rate_max))
    }

    /// The date configured on the camera, UTC, as `YYYY-MM-DD`.
    pub async fn date(&self) -> Result<String, SoapError> {
        let response = self.device_call(device::GET_SYSTEM_DATE_AND_TIME).await?;
        Ok(device::parse_system_date_and_time(&response)?.date)
    }

    /// The time configured on the camera, UTC, as `HH:MM:SS`.
    pub async fn time(&self) -> Result<String, SoapError> {
        let response = self.device_call(device::GET_SYSTEM_DATE_AND_TIME).await?;
        Ok(device::parse_system_date_and_time(&response)?.time)
    }

    pub async fn is_ptz(&self) -> Result<bool, SoapError> {
        let response = self.device_call(device::GET_CAPABILITIES).await?;
        Ok(device::parse_capabilities(&response)?.has_ptz)
    }

    async fn device_information(&self) -> Result<DeviceInformation, SoapError> {
        let response = self.device_call(device::GET_DEVICE_INFORMATION).await?;
        device::parse_device_information(&response)
    }

    async fn video_encoder_options(&self) -> Result<VideoEncoderOptions, SoapError> {
        let body = device::get_video_encoder_configuration_options(&self.profile_token);
        let response = self.media_call(&body).await?;
        device::parse_video_encoder_options(&response)
    }

    async fn device_call(&self, body: &str) -> Result<String, SoapError> {
        self.client
            .call(
                self.device_url.clone(),
                soap::build_envelope(&self.credentials, body),
            )
            .await
    }

    async fn media_call(&self, body: &str) -> Result<String, SoapError> {
        self.client
            .call(
                self.media_url.clone(),
                soap::build_envelope(&self.credentials, body),
            )
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::MockSoapClient;
    use futures_util::FutureExt;

    const CAPABILITIES: &str = r#"<tds:GetCapabilitiesResponse xmlns:tds="urn:x" xmlns:tt="urn:y">
  <tds:Capabilities>
    <tt:Media><tt:XAddr>http://192.168.1.5/onvif/media_service</tt:XAddr></tt:Media>
    <tt:PTZ><tt:XAddr>http://192.168.1.5/onvif/ptz_service</tt:XAddr></tt:PTZ>
  </tds:Capabilities>
</tds:GetCapabilitiesResponse>"#;

    const PROFILES: &str = r#"<trt:GetProfilesResponse xmlns:trt="urn:x" xmlns:tt="urn:y">
  <trt:Profiles token="MainProfile"><tt:Name>main</tt:Name></trt:Profiles>
</trt:GetProfilesResponse>"#;

    const DEVICE_INFORMATION: &str = r#"<tds:GetDeviceInformationResponse xmlns:tds="urn:x">
  <tds:Manufacturer>Acme Optics</tds:Manufacturer>
  <tds:Model>X200</tds:Model>
  <tds:FirmwareVersion>5.60.1</tds:FirmwareVersion>
  <tds:SerialNumber>00:12:41:9a:b3:7c</tds:SerialNumber>
  <tds:HardwareId>X200-R2</tds:HardwareId>
</tds:GetDeviceInformationResponse>"#;

    const DATE_AND_TIME: &str = r#"<tds:GetSystemDateAndTimeResponse xmlns:tds="urn:x" xmlns:tt="urn:y">
  <tds:SystemDateAndTime><tt:UTCDateTime>
    <tt:Time><tt:Hour>9</tt:Hour><tt:Minute>5</tt:Minute><tt:Second>30</tt:Second></tt:Time>
    <tt:Date><tt:Year>2024</tt:Year><tt:Month>3</tt:Month><tt:Day>7</tt:Day></tt:Date>
  </tt:UTCDateTime></tds:SystemDateAndTime>
</tds:GetSystemDateAndTimeResponse>"#;

    const VIDEO_ENCODER_OPTIONS: &str = r#"<trt:GetVideoEncoderConfigurationOptionsResponse xmlns:trt="urn:x" xmlns:tt="urn:y">
  <trt:Options><tt:H264>
    <tt:ResolutionsAvailable><tt:Width>1920</tt:Width><tt:Height>1080</tt:Height></tt:ResolutionsAvailable>
    <tt:FrameRateRange><tt:Min>1</tt:Min><tt:Max>30</tt:Max></tt:FrameRateRange>
  </tt:H264></trt:Options>
</trt:GetVideoEncoderConfigurationOptionsResponse>"#;

    const HOSTNAME: &str = r#"<tds:GetHostnameResponse xmlns:tds="urn:x" xmlns:tt="urn:y">
  <tds:HostnameInformation><tt:Name>lobby-cam</tt:Name></tds:HostnameInformation>
</tds:GetHostnameResponse>"#;

    fn scripted_client() -> MockSoapClient {
        let mut client = MockSoapClient::new();
        client.expect_call().returning(|_, envelope| {
            let response = if envelope.contains("GetCapabilities") {
                CAPABILITIES
            } else if envelope.contains("GetProfiles") {
                PROFILES
            } else if envelope.contains("GetDeviceInformation") {
                DEVICE_INFORMATION
            } else if envelope.contains("GetSystemDateAndTime") {
                DATE_AND_TIME
            } else if envelope.contains("GetVideoEncoderConfigurationOptions") {
                VIDEO_ENCODER_OPTIONS
            } else if envelope.contains("GetHostname") {
                HOSTNAME
            } else {
                panic!("Unexpected SOAP request: {}", envelope)
            };
            async move { Ok(response.to_string()) }.boxed()
        });
        client
    }

    async fn connected_camera() -> Camera {
        Camera::connect_internal("192.168.1.5", "admin", "secret", Box::new(scripted_client()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn connect_retrieves_the_first_media_profile() {
        crate::test::init();

        // When
        let camera = connected_camera().await;

        // Then
        assert_eq!(camera.profile_token, "MainProfile");
        assert_eq!(camera.media_url, "http://192.168.1.5/onvif/media_service");
        assert_eq!(camera.device_url, "http://192.168.1.5/onvif/device_service");
    }

    #[tokio::test]
    async fn connect_failure_produces_no_handle() {
        crate::test::init();

        let mut client = MockSoapClient::new();
        client
            .expect_call()
            .returning(|_, _| async { Err(SoapError::Status(401)) }.boxed());

        // When
        let result =
            Camera::connect_internal("192.168.1.5", "admin", "wrong", Box::new(client)).await;

        // Then
        match result {
            Ok(_) => panic!("A failed connection must not produce a handle"),
            Err(e) => assert_eq!(
                e.to_string(),
                "Could not connect to camera. Verify credentials and ONVIF support."
            ),
        }
    }

    #[tokio::test]
    async fn device_without_media_service_is_rejected() {
        crate::test::init();

        let mut client = MockSoapClient::new();
        client.expect_call().returning(|_, _| {
            async {
                Ok("<tds:GetCapabilitiesResponse xmlns:tds=\"urn:x\"/>".to_string())
            }
            .boxed()
        });

        // When
        let result = Camera::connect_internal("192.168.1.5", "admin", "secret", Box::new(client)).await;

        // Then
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn hostname() {
        crate::test::init();

        assert_eq!(connected_camera().await.hostname().await.unwrap(), "lobby-cam");
    }

    #[tokio::test]
    async fn manufacturer() {
        crate::test::init();

        assert_eq!(
            connected_camera().await.manufacturer().await.unwrap(),
            "Acme Optics"
        );
    }

    #[tokio::test]
    async fn model() {
        crate::test::init();

        assert_eq!(connected_camera().await.model().await.unwrap(), "X200");
    }

    #[tokio::test]
    async fn firmware_version() {
        crate::test::init();

        assert_eq!(
            connected_camera().await.firmware_version().await.unwrap(),
            "5.60.1"
        );
    }

    #[tokio::test]
    async fn mac_address_is_the_serial_number() {
        crate::test::init();

        assert_eq!(
            connected_camera().await.mac_address().await.unwrap(),
            "00:12:41:9a:b3:7c"
        );
    }

    #[tokio::test]
    async fn hardware_id() {
        crate::test::init();

        assert_eq!(
            connected_camera().await.hardware_id().await.unwrap(),
            "X200-R2"
        );
    }

    #[tokio::test]
    async fn resolutions_available() {
        crate::test::init();

        assert_eq!(
            connected_camera().await.resolutions_available().await.unwrap(),
            vec![(1920, 1080)]
        );
    }

    #[tokio::test]
    async fn frame_rate_range() {
        crate::test::init();

        assert_eq!(
            connected_camera().await.frame_rate_range().await.unwrap(),
            (1, 30)
        );
    }

    #[tokio::test]
    async fn date() {
        crate::test::init();

        assert_eq!(connected_camera().await.date().await.unwrap(), "2024-03-07");
    }

    #[tokio::test]
    async fn time() {
        crate::test::init();

        assert_eq!(connected_camera().await.time().await.unwrap(), "09:05:30");
    }

    #[tokio::test]
    async fn is_ptz() {
        crate::test::init();

        assert!(connected_camera().await.is_ptz().await.unwrap());
    }

    #[tokio::test]
    async fn accessor_failures_propagate_untranslated() {
        crate::test::init();

        let camera = connected_camera().await;
        let mut failing = MockSoapClient::new();
        failing
            .expect_call()
            .returning(|_, _| async { Err(SoapError::Fault("Not authorized".to_string())) }.boxed());
        let camera = Camera { client: Box::new(failing), ..camera };

        // When
        let e = camera.model().await.unwrap_err();

        // Then
        if let SoapError::Fault(reason) = e {
            assert_eq!(reason, "Not authorized");
        } else {
            panic!("Accessor failures must surface the transport error as-is");
        }
    }
}
