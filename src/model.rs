use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    prelude::*,
};

/// Number of features left after the two convolution stages (16 channels of 5x5).
const FLAT_FEATURES: usize = 16 * 5 * 5;

/// Small LeNet-style classifier for 3x32x32 images.
#[derive(Module, Debug)]
pub struct Net<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    pool: MaxPool2d,
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
    activation: Relu,
}

#[derive(Config, Debug)]
pub struct NetConfig {
    /// Width of the output layer.
    #[config(default = 10)]
    pub num_classes: usize,
}

impl NetConfig {
    /// Returns the initialized network.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Net<B> {
        Net {
            conv1: Conv2dConfig::new([3, 6], [5, 5]).init(device),
            conv2: Conv2dConfig::new([6, 16], [5, 5]).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1: LinearConfig::new(FLAT_FEATURES, 120).init(device),
            fc2: LinearConfig::new(120, 84).init(device),
            fc3: LinearConfig::new(84, self.num_classes).init(device),
            activation: Relu::new(),
        }
    }
}

impl<B: Backend> Net<B> {
    /// # Shapes
    ///   - Images [batch_size, 3, 32, 32]
    ///   - Output [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(images); // [batch_size, 6, 28, 28]
        let x = self.pool.forward(self.activation.forward(x)); // [batch_size, 6, 14, 14]
        let x = self.conv2.forward(x); // [batch_size, 16, 10, 10]
        let x = self.pool.forward(self.activation.forward(x)); // [batch_size, 16, 5, 5]

        let x = x.flatten::<2>(1, 3);

        let x = self.activation.forward(self.fc1.forward(x));
        let x = self.activation.forward(self.fc2.forward(x));

        self.fc3.forward(x)
    }

    /// Index of the highest logit for each image.
    pub fn classify(&self, images: Tensor<B, 4>) -> Tensor<B, 1, Int> {
        self.forward(images).argmax(1).squeeze(1)
    }
}
