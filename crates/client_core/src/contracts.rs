//! Interfaces of the protocol contracts the client calls.

use alloy::sol;
use alloy::sol_types::SolCall;
use shared::domain::ContractName;

sol! {
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256 balance);
        function approve(address spender, uint256 amount) external returns (bool success);
        function totalSupply() external view returns (uint256 supply);
    }

    /// Test tokens with an open faucet.
    interface IMintable {
        function mint(uint256 amount) external;
    }

    interface IStableToken {
        function depositAndMint(uint256 amount) external;
        function mintToOperator(uint256 amount) external;
    }

    interface IDelegationManager {
        function getDelegatedAmount(address delegator) external view returns (uint256 amount);
        function addDelegation(uint256 amount) external;
        function removeDelegation(uint256 amount) external;
    }

    interface ILoanManager {
        function getLoanDetails() external view returns (
            uint256 amount,
            uint256 interestRate,
            uint256 startTime,
            uint256 dueTime,
            bool isRepaid,
            uint256 collateralAmount,
            uint256 loanedUSDCAmount
        );
        function calculateRepaymentAmount() external view returns (uint256 repayment);
        function createLoan(uint256 amount) external;
        function repayLoan() external;
        function slashLoan(address borrower) external;
    }

    /// ERC-4626 subset used by the savings vault.
    interface IVault {
        function totalAssets() external view returns (uint256 assets);
        function previewDeposit(uint256 assets) external view returns (uint256 shares);
        function previewRedeem(uint256 shares) external view returns (uint256 assets);
        function deposit(uint256 assets, address receiver) external returns (uint256 shares);
        function redeem(uint256 shares, address receiver, address owner) external returns (uint256 assets);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbiFunction {
    pub signature: &'static str,
    pub selector: [u8; 4],
}

macro_rules! abi_functions {
    ($($call:ty),+ $(,)?) => {
        &[$(AbiFunction {
            signature: <$call as SolCall>::SIGNATURE,
            selector: <$call as SolCall>::SELECTOR,
        }),+]
    };
}

/// The set of functions a deployed contract is known to expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbiDescriptor {
    pub interface: &'static str,
    pub functions: &'static [AbiFunction],
}

impl AbiDescriptor {
    pub fn contains(&self, selector: [u8; 4]) -> bool {
        self.functions.iter().any(|f| f.selector == selector)
    }

    pub fn function(&self, selector: [u8; 4]) -> Option<&AbiFunction> {
        self.functions.iter().find(|f| f.selector == selector)
    }
}

const FAUCET_TOKEN: AbiDescriptor = AbiDescriptor {
    interface: "IERC20+IMintable",
    functions: abi_functions!(
        IERC20::balanceOfCall,
        IERC20::approveCall,
        IERC20::totalSupplyCall,
        IMintable::mintCall,
    ),
};

const STABLE_TOKEN: AbiDescriptor = AbiDescriptor {
    interface: "IERC20+IStableToken",
    functions: abi_functions!(
        IERC20::balanceOfCall,
        IERC20::approveCall,
        IERC20::totalSupplyCall,
        IStableToken::depositAndMintCall,
        IStableToken::mintToOperatorCall,
    ),
};

const VAULT_TOKEN: AbiDescriptor = AbiDescriptor {
    interface: "IERC20+IVault",
    functions: abi_functions!(
        IERC20::balanceOfCall,
        IERC20::approveCall,
        IERC20::totalSupplyCall,
        IVault::totalAssetsCall,
        IVault::previewDepositCall,
        IVault::previewRedeemCall,
        IVault::depositCall,
        IVault::redeemCall,
    ),
};

const DELEGATION_MANAGER: AbiDescriptor = AbiDescriptor {
    interface: "IDelegationManager",
    functions: abi_functions!(
        IDelegationManager::getDelegatedAmountCall,
        IDelegationManager::addDelegationCall,
        IDelegationManager::removeDelegationCall,
    ),
};

const LOAN_MANAGER: AbiDescriptor = AbiDescriptor {
    interface: "ILoanManager",
    functions: abi_functions!(
        ILoanManager::getLoanDetailsCall,
        ILoanManager::calculateRepaymentAmountCall,
        ILoanManager::createLoanCall,
        ILoanManager::repayLoanCall,
        ILoanManager::slashLoanCall,
    ),
};

pub fn abi_for(contract: ContractName) -> AbiDescriptor {
    match contract {
        ContractName::ReserveToken | ContractName::CollateralToken => FAUCET_TOKEN,
        ContractName::StableToken => STABLE_TOKEN,
        ContractName::VaultToken => VAULT_TOKEN,
        ContractName::DelegationManager => DELEGATION_MANAGER,
        ContractName::LoanManager => LOAN_MANAGER,
    }
}
