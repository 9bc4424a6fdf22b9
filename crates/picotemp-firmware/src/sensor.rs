//! On-die temperature sensor

use esp_hal::tsens::TemperatureSensor;
use picotemp_core::TemperatureSource;

pub struct OnDieSensor<'d> {
    sensor: TemperatureSensor<'d>,
}

impl<'d> OnDieSensor<'d> {
    pub fn new(sensor: TemperatureSensor<'d>) -> Self {
        Self { sensor }
    }
}

impl TemperatureSource for OnDieSensor<'_> {
    fn read_millicelsius(&mut self) -> i32 {
        let celsius = self.sensor.get_temperature().to_celsius();
        (celsius * 1000.0) as i32
    }
}
